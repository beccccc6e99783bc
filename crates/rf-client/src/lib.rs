pub mod client;
pub mod events;
pub mod image;
pub mod session;

pub use client::{ClientError, RelayClient};
pub use events::WorkflowEvent;
pub use image::{ImageLoadError, load_reference_image};
pub use session::Session;
