use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::uploads::UploadDir;
use crate::upstream::VideoBackend;

pub struct RelayState {
    backend: Arc<dyn VideoBackend>,
    uploads: UploadDir,
    shutdown: CancellationToken,
}

impl RelayState {
    pub fn new(backend: Arc<dyn VideoBackend>, uploads: UploadDir, shutdown: CancellationToken) -> Self {
        Self {
            backend,
            uploads,
            shutdown,
        }
    }

    pub fn backend(&self) -> &dyn VideoBackend {
        self.backend.as_ref()
    }

    pub fn uploads(&self) -> &UploadDir {
        &self.uploads
    }

    /// Token for one request: cancelled with the server, or earlier by the
    /// request itself.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
