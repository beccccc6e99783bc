pub mod error;
pub mod input;
pub mod prompts;
pub mod schemas;
pub mod workflow;
mod mode_types;

pub use error::{InputError, WorkflowError};
pub use input::{GenerationRequest, ReferenceImage, MAX_IMAGE_BYTES, MAX_PROMPT_CHARS};
pub use mode_types::GenerationMode;
pub use schemas::{ErrorEnvelope, GenerationResult, HealthStatus, ProceedRequest, ProceedResult};
pub use workflow::{AdvanceRule, Workflow, WorkflowStage};
