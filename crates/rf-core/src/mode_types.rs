use crate::input::GenerationRequest;

/// Which kind of upstream job a generation request turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    #[default]
    TextToVideo,
    ImageToVideo,
}

impl GenerationMode {
    pub fn for_request(request: &GenerationRequest) -> Self {
        Self::with_image(request.has_image())
    }

    pub fn with_image(has_image: bool) -> Self {
        if has_image {
            Self::ImageToVideo
        } else {
            Self::TextToVideo
        }
    }

    /// Name for logs and status lines
    pub fn name(&self) -> &str {
        match self {
            Self::TextToVideo => "text-to-video",
            Self::ImageToVideo => "image-to-video",
        }
    }

    /// Message the relay reports alongside a finished video
    pub fn completion_message(&self) -> &str {
        match self {
            Self::TextToVideo => "Video generated from text prompt",
            Self::ImageToVideo => "Video generated with image reference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ReferenceImage;

    #[test]
    fn test_mode_follows_image() {
        let text = GenerationRequest::new("a red fox", None).unwrap();
        assert_eq!(GenerationMode::for_request(&text), GenerationMode::TextToVideo);

        let img = ReferenceImage::new("fox.png", "image/png", vec![1]).unwrap();
        let with_image = GenerationRequest::new("a red fox", Some(img)).unwrap();
        assert_eq!(GenerationMode::for_request(&with_image), GenerationMode::ImageToVideo);
    }

    #[test]
    fn test_completion_messages() {
        assert_eq!(
            GenerationMode::ImageToVideo.completion_message(),
            "Video generated with image reference"
        );
        assert_eq!(
            GenerationMode::TextToVideo.completion_message(),
            "Video generated from text prompt"
        );
    }

    #[test]
    fn test_default_is_text() {
        assert_eq!(GenerationMode::default(), GenerationMode::TextToVideo);
    }
}
