//! Prompt and reference-image intake.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::InputError;

/// Upper bound on prompt length, counted in characters rather than bytes.
pub const MAX_PROMPT_CHARS: usize = 500;

/// Upper bound on a reference image upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

pub fn check_prompt_length(prompt: &str) -> Result<(), InputError> {
    let len = prompt.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(InputError::PromptTooLong(len));
    }
    Ok(())
}

/// An image the user supplied to guide generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl ReferenceImage {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, InputError> {
        let mime_type = mime_type.into();
        if !is_image_mime(&mime_type) {
            return Err(InputError::NotAnImage(mime_type));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(InputError::ImageTooLarge(bytes.len()));
        }

        Ok(Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        })
    }

    /// Builds a reference image, taking the MIME type from the file content
    /// instead of trusting a name or extension.
    pub fn sniff(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, InputError> {
        let mime_type = match image::guess_format(&bytes) {
            Ok(format) => format.to_mime_type().to_string(),
            Err(_) => "application/octet-stream".to_string(),
        };
        Self::new(file_name, mime_type, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Inline `data:` URL used to show the image before anything is uploaded.
    pub fn preview_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    pub fn size_label(&self) -> String {
        format_file_size(self.bytes.len())
    }
}

/// Formats a byte count as `Bytes`, `KB` or `MB` with at most two decimals.
pub fn format_file_size(bytes: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Everything needed for one generation attempt. Built per user action and
/// dropped once the relay call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<ReferenceImage>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, image: Option<ReferenceImage>) -> Result<Self, InputError> {
        let prompt = prompt.into();
        check_prompt_length(&prompt)?;
        if prompt.trim().is_empty() && image.is_none() {
            return Err(InputError::EmptyPrompt);
        }

        Ok(Self { prompt, image })
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// How close a prompt is to the length limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBudget {
    Normal,
    Warning,
    Critical,
}

impl PromptBudget {
    pub fn for_prompt(prompt: &str) -> Self {
        match prompt.chars().count() {
            0..=300 => Self::Normal,
            301..=400 => Self::Warning,
            _ => Self::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn rejects_non_image_mime() {
        let err = ReferenceImage::new("notes.txt", "text/plain", vec![1, 2, 3]).unwrap_err();
        assert_eq!(err, InputError::NotAnImage("text/plain".into()));
        assert_eq!(err.to_string(), "Only image files are allowed");
    }

    #[test]
    fn rejects_oversized_image() {
        let err = ReferenceImage::new("big.png", "image/png", vec![0; MAX_IMAGE_BYTES + 1]).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 10MB.");
    }

    #[test]
    fn accepts_image_at_limit() {
        let img = ReferenceImage::new("edge.png", "image/png", vec![0; MAX_IMAGE_BYTES]).unwrap();
        assert_eq!(img.len(), MAX_IMAGE_BYTES);
    }

    #[test]
    fn sniffs_png_content() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 16]);
        let img = ReferenceImage::sniff("upload.bin", bytes).unwrap();
        assert_eq!(img.mime_type(), "image/png");
    }

    #[test]
    fn sniff_rejects_unknown_content() {
        let err = ReferenceImage::sniff("fake.png", b"just some text".to_vec()).unwrap_err();
        assert!(matches!(err, InputError::NotAnImage(_)));
    }

    #[test]
    fn preview_is_data_url() {
        let img = ReferenceImage::new("a.gif", "image/gif", b"GIF".to_vec()).unwrap();
        assert_eq!(img.preview_data_url(), "data:image/gif;base64,R0lG");
    }

    #[test]
    fn file_size_labels() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(2_359_296), "2.25 MB");
    }

    #[test]
    fn prompt_required_without_image() {
        assert_eq!(GenerationRequest::new("   ", None).unwrap_err(), InputError::EmptyPrompt);

        let img = ReferenceImage::new("a.png", "image/png", vec![1]).unwrap();
        let req = GenerationRequest::new("", Some(img)).unwrap();
        assert!(req.has_image());
    }

    #[test]
    fn prompt_length_counts_characters() {
        let at_limit = "é".repeat(MAX_PROMPT_CHARS);
        assert!(GenerationRequest::new(at_limit, None).is_ok());

        let over = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert_eq!(
            GenerationRequest::new(over, None).unwrap_err(),
            InputError::PromptTooLong(MAX_PROMPT_CHARS + 1)
        );
    }

    #[test]
    fn budget_levels() {
        assert_eq!(PromptBudget::for_prompt(&"a".repeat(300)), PromptBudget::Normal);
        assert_eq!(PromptBudget::for_prompt(&"a".repeat(301)), PromptBudget::Warning);
        assert_eq!(PromptBudget::for_prompt(&"a".repeat(401)), PromptBudget::Critical);
    }
}
