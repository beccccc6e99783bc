use rf_core::workflow::NETWORK_ERROR;
use rf_core::{AdvanceRule, ReferenceImage, Workflow, WorkflowError, WorkflowStage};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::client::RelayClient;
use crate::events::WorkflowEvent;

/// One user's pass through the workflow, wired to a relay.
///
/// Failures reported by the relay or the network end up in
/// [`Workflow::error`]; only requests the workflow refuses outright
/// (busy, empty prompt, no video) are returned as errors.
pub struct Session {
    workflow: Workflow,
    client: RelayClient,
    events: Option<UnboundedSender<WorkflowEvent>>,
}

impl Session {
    pub fn new(client: RelayClient, rule: AdvanceRule) -> Self {
        Self {
            workflow: Workflow::new(rule),
            client,
            events: None,
        }
    }

    pub fn with_events(mut self, tx: UnboundedSender<WorkflowEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn client(&self) -> &RelayClient {
        &self.client
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> Result<(), WorkflowError> {
        self.track(|wf| wf.set_prompt(prompt))
    }

    pub fn attach_image(&mut self, image: ReferenceImage) -> Result<(), WorkflowError> {
        self.track(|wf| wf.attach_image(image))
    }

    pub fn remove_image(&mut self) -> Option<ReferenceImage> {
        self.track(Workflow::remove_image)
    }

    /// Sends the current prompt and image to the relay. Returns whether a
    /// video came back.
    pub async fn generate(&mut self) -> Result<bool, WorkflowError> {
        let request = self.track(Workflow::begin_generation)?;
        info!(
            prompt_chars = request.prompt.chars().count(),
            with_image = request.has_image(),
            "Requesting video"
        );

        match self.client.generate(&request).await {
            Ok(result) => {
                self.track(|wf| wf.complete_generation(&result));
                if let Some(video_url) = self.workflow.video_url() {
                    info!(job_id = ?result.job_id, "Video ready at {}", without_query(video_url));
                    let event = WorkflowEvent::VideoReady {
                        video_url: video_url.to_string(),
                        job_id: result.job_id.clone(),
                        message: result.message.clone().unwrap_or_default(),
                    };
                    self.emit(event);
                    return Ok(true);
                }
            }
            Err(e) => {
                warn!("Generation request failed: {e}");
                self.track(|wf| wf.fail_generation(NETWORK_ERROR));
            }
        }

        self.emit_failure(WorkflowStage::Generating);
        Ok(false)
    }

    /// Hands the generated video to the 3D step. Returns whether the relay
    /// accepted it.
    pub async fn proceed(&mut self) -> Result<bool, WorkflowError> {
        let request = self.track(Workflow::begin_proceed)?;
        info!(video_url = %request.video_url, "Proceeding to 3D");

        match self.client.proceed_to_3d(&request).await {
            Ok(result) => {
                self.track(|wf| wf.complete_proceed(&result));
                if result.success {
                    self.emit(WorkflowEvent::RenderingStarted {
                        rendering_id: self.workflow.rendering_id().map(str::to_string),
                        message: result.message.unwrap_or_default(),
                    });
                    return Ok(true);
                }
            }
            Err(e) => {
                warn!("Proceed request failed: {e}");
                self.track(|wf| wf.fail_proceed(NETWORK_ERROR));
            }
        }

        self.emit_failure(WorkflowStage::Proceeding);
        Ok(false)
    }

    /// Runs `f` on the workflow and publishes the stage change, if any.
    fn track<R>(&mut self, f: impl FnOnce(&mut Workflow) -> R) -> R {
        let from = self.workflow.stage();
        let out = f(&mut self.workflow);
        let to = self.workflow.stage();
        if from != to {
            self.emit(WorkflowEvent::StageChanged { from, to });
        }
        out
    }

    fn emit_failure(&self, stage: WorkflowStage) {
        let error = self.workflow.error().unwrap_or(NETWORK_ERROR).to_string();
        warn!("{} failed: {error}", stage.title());
        self.emit(WorkflowEvent::Failed { stage, error });
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Drops the query string, which can carry the service's API key.
fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
