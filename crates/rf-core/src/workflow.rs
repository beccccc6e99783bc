//! The five-stage journey from prompt entry to the 3D hand-off.
//!
//! [`Workflow`] only tracks state; callers perform the relay calls between a
//! `begin_*` and the matching `complete_*`/`fail_*`.

use crate::error::{InputError, WorkflowError};
use crate::input::{GenerationRequest, ReferenceImage, check_prompt_length};
use crate::schemas::{GenerationResult, ProceedRequest, ProceedResult};

pub const GENERATION_FAILED: &str = "Failed to generate video";
pub const PROCEED_FAILED: &str = "Failed to proceed to 3D rendering";
pub const NETWORK_ERROR: &str = "Network error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkflowStage {
    Prompt = 1,
    Reference = 2,
    Generating = 3,
    Review = 4,
    Proceeding = 5,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 5] = [
        Self::Prompt,
        Self::Reference,
        Self::Generating,
        Self::Review,
        Self::Proceeding,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Prompt => "Create Prompt",
            Self::Reference => "Add Reference",
            Self::Generating => "Generate Video",
            Self::Review => "Review & Edit",
            Self::Proceeding => "Proceed to 3D",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Prompt => "Describe your vision",
            Self::Reference => "Upload an image (optional)",
            Self::Generating => "AI creates your video",
            Self::Review => "Preview your creation",
            Self::Proceeding => "Transform to 3D experience",
        }
    }
}

/// What moves the journey from "Create Prompt" to "Add Reference".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvanceRule {
    /// Attaching an image is enough.
    ImageUpload,
    /// A non-empty prompt is enough.
    PromptEntered,
    /// Both a prompt and an image are needed.
    #[default]
    PromptAndImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Waiting,
    Generating,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSummary {
    pub progress_percent: u8,
    pub label: StatusLabel,
}

#[derive(Debug, Clone)]
pub struct Workflow {
    rule: AdvanceRule,
    stage: WorkflowStage,
    prompt: String,
    image: Option<ReferenceImage>,
    loading: bool,
    proceeding: bool,
    error: Option<String>,
    video_url: Option<String>,
    rendering_id: Option<String>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(AdvanceRule::default())
    }
}

impl Workflow {
    pub fn new(rule: AdvanceRule) -> Self {
        Self {
            rule,
            stage: WorkflowStage::Prompt,
            prompt: String::new(),
            image: None,
            loading: false,
            proceeding: false,
            error: None,
            video_url: None,
            rendering_id: None,
        }
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn rule(&self) -> AdvanceRule {
        self.rule
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&ReferenceImage> {
        self.image.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    pub fn rendering_id(&self) -> Option<&str> {
        self.rendering_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_proceeding(&self) -> bool {
        self.proceeding
    }

    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }

    /// Mirrors the enabled state of the generate trigger.
    pub fn can_generate(&self) -> bool {
        !self.loading && !self.prompt.trim().is_empty()
    }

    pub fn status(&self) -> StatusSummary {
        let label = if self.loading {
            StatusLabel::Generating
        } else if self.has_video() {
            StatusLabel::Ready
        } else {
            StatusLabel::Waiting
        };

        StatusSummary {
            progress_percent: (f32::from(self.stage.number()) / 5.0 * 100.0).round() as u8,
            label,
        }
    }

    /// Replaces the prompt. Edits past the length limit are refused and leave
    /// the current prompt as it was.
    pub fn set_prompt(&mut self, value: impl Into<String>) -> Result<(), WorkflowError> {
        if self.loading {
            return Err(WorkflowError::Busy);
        }
        let value = value.into();
        check_prompt_length(&value)?;

        self.prompt = value;
        self.try_advance_from_prompt();
        Ok(())
    }

    pub fn attach_image(&mut self, image: ReferenceImage) -> Result<(), WorkflowError> {
        if self.loading {
            return Err(WorkflowError::Busy);
        }
        self.image = Some(image);
        self.try_advance_from_prompt();
        Ok(())
    }

    pub fn remove_image(&mut self) -> Option<ReferenceImage> {
        self.image.take()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn try_advance_from_prompt(&mut self) {
        if self.stage != WorkflowStage::Prompt {
            return;
        }

        let has_prompt = !self.prompt.trim().is_empty();
        let has_image = self.image.is_some();
        let ready = match self.rule {
            AdvanceRule::ImageUpload => has_image,
            AdvanceRule::PromptEntered => has_prompt,
            AdvanceRule::PromptAndImage => has_prompt && has_image,
        };
        if ready {
            self.stage = WorkflowStage::Reference;
        }
    }

    /// Moves to "generating" and hands back the request to send.
    pub fn begin_generation(&mut self) -> Result<GenerationRequest, WorkflowError> {
        if self.loading {
            return Err(WorkflowError::Busy);
        }
        if self.prompt.trim().is_empty() {
            let err = InputError::EmptyPrompt;
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        let request = GenerationRequest::new(self.prompt.clone(), self.image.clone())?;

        self.loading = true;
        self.error = None;
        self.video_url = None;
        self.rendering_id = None;
        self.stage = WorkflowStage::Generating;

        Ok(request)
    }

    /// Applies a decoded relay response. Returns false when no generation was
    /// in flight.
    pub fn complete_generation(&mut self, result: &GenerationResult) -> bool {
        if !self.loading {
            return false;
        }
        self.loading = false;

        match result.video_url.as_deref().filter(|_| result.is_complete()) {
            Some(url) => {
                self.video_url = Some(url.to_string());
                self.stage = WorkflowStage::Review;
            }
            None => {
                self.error = Some(result.display_message(GENERATION_FAILED));
                self.stage = WorkflowStage::Prompt;
            }
        }
        true
    }

    /// Records a failure that produced no decodable response.
    pub fn fail_generation(&mut self, message: impl Into<String>) -> bool {
        if !self.loading {
            return false;
        }
        self.loading = false;
        self.error = Some(message.into());
        self.stage = WorkflowStage::Prompt;
        true
    }

    pub fn begin_proceed(&mut self) -> Result<ProceedRequest, WorkflowError> {
        if self.proceeding || self.loading {
            return Err(WorkflowError::Busy);
        }
        let Some(video_url) = self.video_url.clone().filter(|url| !url.is_empty()) else {
            let err = WorkflowError::NoVideo;
            self.error = Some(err.to_string());
            return Err(err);
        };

        self.proceeding = true;
        self.error = None;
        self.stage = WorkflowStage::Proceeding;

        Ok(ProceedRequest {
            video_url,
            prompt: self.prompt.clone(),
        })
    }

    pub fn complete_proceed(&mut self, result: &ProceedResult) -> bool {
        if !self.proceeding {
            return false;
        }
        self.proceeding = false;

        if result.success {
            self.rendering_id = result.rendering_id.clone().filter(|id| !id.is_empty());
        } else {
            self.error = Some(result.display_message(PROCEED_FAILED));
            self.stage = WorkflowStage::Review;
        }
        true
    }

    pub fn fail_proceed(&mut self, message: impl Into<String>) -> bool {
        if !self.proceeding {
            return false;
        }
        self.proceeding = false;
        self.error = Some(message.into());
        self.stage = WorkflowStage::Review;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> ReferenceImage {
        ReferenceImage::new("ref.png", "image/png", vec![0x89, b'P', b'N', b'G']).unwrap()
    }

    #[test]
    fn empty_prompt_blocks_generation() {
        let mut wf = Workflow::default();
        let err = wf.begin_generation().unwrap_err();

        assert_eq!(err, WorkflowError::Input(InputError::EmptyPrompt));
        assert_eq!(wf.error(), Some("Please enter a prompt"));
        assert_eq!(wf.stage(), WorkflowStage::Prompt);
        assert!(!wf.is_loading());
    }

    #[test]
    fn text_only_generation_reaches_review() {
        let mut wf = Workflow::default();
        wf.set_prompt("A mystical dragon soaring through ancient mountains").unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Prompt);

        let request = wf.begin_generation().unwrap();
        assert!(!request.has_image());
        assert_eq!(wf.stage(), WorkflowStage::Generating);
        assert!(wf.is_loading());
        assert_eq!(wf.status().label, StatusLabel::Generating);

        let result = GenerationResult::succeeded("https://cdn.example/dragon.mp4", None, "ok");
        assert!(wf.complete_generation(&result));
        assert_eq!(wf.stage(), WorkflowStage::Review);
        assert_eq!(wf.video_url(), Some("https://cdn.example/dragon.mp4"));
        assert_eq!(wf.status(), StatusSummary { progress_percent: 80, label: StatusLabel::Ready });
    }

    #[test]
    fn failed_generation_returns_to_prompt() {
        let mut wf = Workflow::default();
        wf.set_prompt("ocean waves").unwrap();
        wf.begin_generation().unwrap();

        let result = GenerationResult::failed(GENERATION_FAILED, Some("upstream said no".into()));
        wf.complete_generation(&result);

        assert_eq!(wf.stage(), WorkflowStage::Prompt);
        assert_eq!(wf.error(), Some("upstream said no"));
        assert!(!wf.is_loading());
        assert!(!wf.has_video());
    }

    #[test]
    fn success_flag_without_url_is_a_failure() {
        let mut wf = Workflow::default();
        wf.set_prompt("ocean waves").unwrap();
        wf.begin_generation().unwrap();

        let result = GenerationResult { success: true, ..Default::default() };
        wf.complete_generation(&result);

        assert_eq!(wf.stage(), WorkflowStage::Prompt);
        assert_eq!(wf.error(), Some(GENERATION_FAILED));
    }

    #[test]
    fn network_failure_uses_given_message() {
        let mut wf = Workflow::default();
        wf.set_prompt("forest path").unwrap();
        wf.begin_generation().unwrap();

        assert!(wf.fail_generation(NETWORK_ERROR));
        assert_eq!(wf.error(), Some(NETWORK_ERROR));
        assert_eq!(wf.stage(), WorkflowStage::Prompt);
    }

    #[test]
    fn second_generation_is_refused_while_loading() {
        let mut wf = Workflow::default();
        wf.set_prompt("desert sunset").unwrap();
        wf.begin_generation().unwrap();

        assert_eq!(wf.begin_generation().unwrap_err(), WorkflowError::Busy);
        assert_eq!(wf.set_prompt("other").unwrap_err(), WorkflowError::Busy);
    }

    #[test]
    fn regenerate_clears_previous_video() {
        let mut wf = Workflow::default();
        wf.set_prompt("city lights").unwrap();
        wf.begin_generation().unwrap();
        wf.complete_generation(&GenerationResult::succeeded("https://v/1.mp4", None, "ok"));

        wf.begin_generation().unwrap();
        assert!(!wf.has_video());
        assert_eq!(wf.stage(), WorkflowStage::Generating);
    }

    #[test]
    fn overlong_prompt_edit_is_ignored() {
        let mut wf = Workflow::default();
        wf.set_prompt("short").unwrap();
        let err = wf.set_prompt("x".repeat(501)).unwrap_err();

        assert_eq!(err, WorkflowError::Input(InputError::PromptTooLong(501)));
        assert_eq!(wf.prompt(), "short");
    }

    #[test]
    fn advance_rules() {
        let mut by_image = Workflow::new(AdvanceRule::ImageUpload);
        by_image.attach_image(png()).unwrap();
        assert_eq!(by_image.stage(), WorkflowStage::Reference);

        let mut by_prompt = Workflow::new(AdvanceRule::PromptEntered);
        by_prompt.set_prompt("  ").unwrap();
        assert_eq!(by_prompt.stage(), WorkflowStage::Prompt);
        by_prompt.set_prompt("castle").unwrap();
        assert_eq!(by_prompt.stage(), WorkflowStage::Reference);

        let mut both = Workflow::new(AdvanceRule::PromptAndImage);
        both.set_prompt("castle").unwrap();
        assert_eq!(both.stage(), WorkflowStage::Prompt);
        both.attach_image(png()).unwrap();
        assert_eq!(both.stage(), WorkflowStage::Reference);
    }

    #[test]
    fn removing_image_keeps_stage() {
        let mut wf = Workflow::new(AdvanceRule::ImageUpload);
        wf.attach_image(png()).unwrap();
        assert!(wf.remove_image().is_some());
        assert_eq!(wf.stage(), WorkflowStage::Reference);
        assert!(wf.image().is_none());
    }

    #[test]
    fn proceed_requires_video() {
        let mut wf = Workflow::default();
        assert_eq!(wf.begin_proceed().unwrap_err(), WorkflowError::NoVideo);
        assert_eq!(wf.error(), Some("No video available to proceed"));
        assert_eq!(wf.stage(), WorkflowStage::Prompt);
    }

    #[test]
    fn proceed_success_stays_on_final_stage() {
        let mut wf = Workflow::default();
        wf.set_prompt("space journey").unwrap();
        wf.begin_generation().unwrap();
        wf.complete_generation(&GenerationResult::succeeded("https://v/2.mp4", None, "ok"));

        let req = wf.begin_proceed().unwrap();
        assert_eq!(req.video_url, "https://v/2.mp4");
        assert_eq!(req.prompt, "space journey");
        assert_eq!(wf.stage(), WorkflowStage::Proceeding);

        wf.complete_proceed(&ProceedResult::initiated("https://v/2.mp4", "3d_42"));
        assert_eq!(wf.stage(), WorkflowStage::Proceeding);
        assert_eq!(wf.rendering_id(), Some("3d_42"));
        assert!(!wf.is_proceeding());
    }

    #[test]
    fn proceed_failure_returns_to_review() {
        let mut wf = Workflow::default();
        wf.set_prompt("space journey").unwrap();
        wf.begin_generation().unwrap();
        wf.complete_generation(&GenerationResult::succeeded("https://v/2.mp4", None, "ok"));
        wf.begin_proceed().unwrap();

        wf.complete_proceed(&ProceedResult::default());
        assert_eq!(wf.stage(), WorkflowStage::Review);
        assert_eq!(wf.error(), Some(PROCEED_FAILED));
        assert!(wf.has_video());
    }

    #[test]
    fn completions_without_pending_call_are_ignored() {
        let mut wf = Workflow::default();
        assert!(!wf.complete_generation(&GenerationResult::succeeded("u", None, "m")));
        assert!(!wf.fail_proceed("nope"));
        assert_eq!(wf.stage(), WorkflowStage::Prompt);
        assert!(!wf.has_video());
    }

    #[test]
    fn stage_metadata() {
        let numbers: Vec<u8> = WorkflowStage::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(WorkflowStage::Review.title(), "Review & Edit");
        assert_eq!(Workflow::default().status().progress_percent, 20);
    }
}
