use thiserror::Error;

use crate::input::{MAX_IMAGE_BYTES, MAX_PROMPT_CHARS};

/// Rejections raised while collecting a prompt or a reference image.
///
/// The `Display` text of each variant is what a user gets to see.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("Prompt must be at most {MAX_PROMPT_CHARS} characters (got {0})")]
    PromptTooLong(usize),
    #[error("Only image files are allowed")]
    NotAnImage(String),
    #[error("File too large. Maximum size is {}MB.", MAX_IMAGE_BYTES / (1024 * 1024))]
    ImageTooLarge(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("A generation is already in progress")]
    Busy,
    #[error("No video available to proceed")]
    NoVideo,
}
