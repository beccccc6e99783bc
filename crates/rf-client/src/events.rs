use rf_core::WorkflowStage;

/// Published by a [`crate::Session`] as the workflow moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StageChanged {
        from: WorkflowStage,
        to: WorkflowStage,
    },
    VideoReady {
        video_url: String,
        job_id: Option<String>,
        message: String,
    },
    RenderingStarted {
        rendering_id: Option<String>,
        message: String,
    },
    Failed {
        stage: WorkflowStage,
        error: String,
    },
}
