//! Generation job model: request parameters, handles, and statuses.
//!
//! A [`JobRequest`] can only be built through [`JobRequest::new`], which
//! enforces the cross-field invariants: a reference image is present iff
//! the mode is image-to-video, and a duration is present iff the mode
//! produces a video.

use std::fmt;

use chrono::Utc;

use crate::error::CoreError;
use crate::media::{encode_data_uri, MediaKind, MAX_REFERENCE_IMAGE_BYTES};
use crate::output::OutputRef;
use crate::types::Timestamp;

/// Maximum prompt length accepted by the provider, in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// Enumerated parameters
// ---------------------------------------------------------------------------

/// What the job generates, and from which inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    TextToVideo,
    ImageToVideo,
    TextToImage,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 3] = [
        GenerationMode::TextToVideo,
        GenerationMode::ImageToVideo,
        GenerationMode::TextToImage,
    ];

    /// Whether the job produces a video (and therefore needs a duration).
    pub fn produces_video(self) -> bool {
        !matches!(self, GenerationMode::TextToImage)
    }

    /// Whether the job needs a reference image.
    pub fn needs_reference_image(self) -> bool {
        matches!(self, GenerationMode::ImageToVideo)
    }

    pub fn media_kind(self) -> MediaKind {
        if self.produces_video() {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Human-readable label for menus and messages.
    pub fn label(self) -> &'static str {
        match self {
            GenerationMode::TextToVideo => "Text → video",
            GenerationMode::ImageToVideo => "Image + text → video",
            GenerationMode::TextToImage => "Text → image",
        }
    }
}

/// Length of a generated clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipDuration {
    Five,
    Ten,
}

impl ClipDuration {
    pub const ALL: [ClipDuration; 2] = [ClipDuration::Five, ClipDuration::Ten];

    pub fn seconds(self) -> u32 {
        match self {
            ClipDuration::Five => 5,
            ClipDuration::Ten => 10,
        }
    }

    pub fn from_seconds(secs: u32) -> Option<Self> {
        match secs {
            5 => Some(ClipDuration::Five),
            10 => Some(ClipDuration::Ten),
            _ => None,
        }
    }
}

/// Output resolution, expressed in the provider's `W:H` pixel notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Landscape1280x720,
    Portrait720x1280,
    Square960x960,
    Landscape1104x832,
    Portrait832x1104,
    Wide1584x672,
    Landscape1920x1080,
    Portrait1080x1920,
    Square1024x1024,
}

const VIDEO_RATIOS: &[AspectRatio] = &[
    AspectRatio::Landscape1280x720,
    AspectRatio::Portrait720x1280,
    AspectRatio::Square960x960,
    AspectRatio::Landscape1104x832,
    AspectRatio::Portrait832x1104,
    AspectRatio::Wide1584x672,
];

const IMAGE_RATIOS: &[AspectRatio] = &[
    AspectRatio::Landscape1920x1080,
    AspectRatio::Portrait1080x1920,
    AspectRatio::Square1024x1024,
    AspectRatio::Landscape1280x720,
    AspectRatio::Portrait720x1280,
];

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape1280x720 => "1280:720",
            AspectRatio::Portrait720x1280 => "720:1280",
            AspectRatio::Square960x960 => "960:960",
            AspectRatio::Landscape1104x832 => "1104:832",
            AspectRatio::Portrait832x1104 => "832:1104",
            AspectRatio::Wide1584x672 => "1584:672",
            AspectRatio::Landscape1920x1080 => "1920:1080",
            AspectRatio::Portrait1080x1920 => "1080:1920",
            AspectRatio::Square1024x1024 => "1024:1024",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        VIDEO_RATIOS
            .iter()
            .chain(IMAGE_RATIOS)
            .copied()
            .find(|r| r.as_str() == value)
    }

    /// The ratios the provider accepts for a given mode.
    pub fn options_for(mode: GenerationMode) -> &'static [AspectRatio] {
        if mode.produces_video() {
            VIDEO_RATIOS
        } else {
            IMAGE_RATIOS
        }
    }

    pub fn supports(self, mode: GenerationMode) -> bool {
        Self::options_for(mode).contains(&self)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model names used for each kind of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    pub video_model: String,
    pub image_model: String,
}

impl ModelCatalog {
    pub fn model_for(&self, mode: GenerationMode) -> &str {
        if mode.produces_video() {
            &self.video_model
        } else {
            &self.image_model
        }
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            video_model: "gen4_turbo".to_string(),
            image_model: "gen4_image".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference image
// ---------------------------------------------------------------------------

/// Image uploaded by the user as the first frame of an image-to-video job.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn to_data_uri(&self) -> String {
        encode_data_uri(&self.bytes, &self.content_type)
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// JobRequest
// ---------------------------------------------------------------------------

/// A complete, validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    mode: GenerationMode,
    prompt_text: String,
    reference_image: Option<ReferenceImage>,
    duration: Option<ClipDuration>,
    aspect_ratio: AspectRatio,
    model_name: String,
}

impl JobRequest {
    /// Validate and build a request.
    ///
    /// The prompt is trimmed before validation.
    pub fn new(
        mode: GenerationMode,
        prompt_text: &str,
        reference_image: Option<ReferenceImage>,
        duration: Option<ClipDuration>,
        aspect_ratio: AspectRatio,
        model_name: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let prompt_text = validate_prompt(prompt_text)?;

        if reference_image.is_some() != mode.needs_reference_image() {
            return Err(CoreError::Validation(format!(
                "A reference image is required for image-to-video and not allowed otherwise (mode: {mode:?})"
            )));
        }
        if let Some(image) = &reference_image {
            validate_reference_image(image)?;
        }
        if duration.is_some() != mode.produces_video() {
            return Err(CoreError::Validation(format!(
                "A duration is required for video jobs and not allowed for image jobs (mode: {mode:?})"
            )));
        }
        if !aspect_ratio.supports(mode) {
            return Err(CoreError::Validation(format!(
                "Aspect ratio {aspect_ratio} is not available for {mode:?}"
            )));
        }

        let model_name = model_name.into();
        if model_name.trim().is_empty() {
            return Err(CoreError::Validation("Model name must not be empty".into()));
        }

        Ok(Self {
            mode,
            prompt_text,
            reference_image,
            duration,
            aspect_ratio,
            model_name,
        })
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn reference_image(&self) -> Option<&ReferenceImage> {
        self.reference_image.as_ref()
    }

    pub fn duration(&self) -> Option<ClipDuration> {
        self.duration
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Trim a prompt and check it is non-empty and within the provider limit.
pub fn validate_prompt(prompt: &str) -> Result<String, CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt text must not be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt is {chars} characters long; the limit is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Check a reference image is non-empty and under the size limit.
pub fn validate_reference_image(image: &ReferenceImage) -> Result<(), CoreError> {
    if image.bytes.is_empty() {
        return Err(CoreError::Validation("Reference image is empty".into()));
    }
    if image.bytes.len() > MAX_REFERENCE_IMAGE_BYTES {
        return Err(CoreError::Validation(format!(
            "Reference image is {} bytes; the limit is {MAX_REFERENCE_IMAGE_BYTES}",
            image.bytes.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handle and status
// ---------------------------------------------------------------------------

/// Provider-assigned identity of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub submitted_at: Timestamp,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Normalized status of a job, produced by each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded(OutputRef),
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded(_) | JobStatus::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ReferenceImage {
        ReferenceImage::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg")
    }

    // -- Invariants --

    #[test]
    fn text_to_video_requires_duration_and_no_image() {
        let req = JobRequest::new(
            GenerationMode::TextToVideo,
            "a cat surfing",
            None,
            Some(ClipDuration::Five),
            AspectRatio::Landscape1280x720,
            "gen4_turbo",
        )
        .unwrap();
        assert!(req.reference_image().is_none());
        assert_eq!(req.duration(), Some(ClipDuration::Five));
    }

    #[test]
    fn image_to_video_requires_image() {
        let err = JobRequest::new(
            GenerationMode::ImageToVideo,
            "pan left",
            None,
            Some(ClipDuration::Ten),
            AspectRatio::Landscape1280x720,
            "gen4_turbo",
        );
        assert!(err.is_err());

        let ok = JobRequest::new(
            GenerationMode::ImageToVideo,
            "pan left",
            Some(image()),
            Some(ClipDuration::Ten),
            AspectRatio::Landscape1280x720,
            "gen4_turbo",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn text_to_video_rejects_image() {
        let err = JobRequest::new(
            GenerationMode::TextToVideo,
            "a cat",
            Some(image()),
            Some(ClipDuration::Five),
            AspectRatio::Landscape1280x720,
            "gen4_turbo",
        );
        assert!(err.is_err());
    }

    #[test]
    fn text_to_image_rejects_duration() {
        let err = JobRequest::new(
            GenerationMode::TextToImage,
            "a castle",
            None,
            Some(ClipDuration::Five),
            AspectRatio::Square1024x1024,
            "gen4_image",
        );
        assert!(err.is_err());
    }

    #[test]
    fn ratio_must_match_mode() {
        let err = JobRequest::new(
            GenerationMode::TextToImage,
            "a castle",
            None,
            None,
            AspectRatio::Wide1584x672,
            "gen4_image",
        );
        assert!(err.is_err());
    }

    // -- Prompt validation --

    #[test]
    fn prompt_is_trimmed() {
        assert_eq!(validate_prompt("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn blank_prompt_rejected() {
        assert!(validate_prompt("   ").is_err());
    }

    #[test]
    fn overlong_prompt_rejected() {
        let prompt = "x".repeat(MAX_PROMPT_CHARS + 1);
        assert!(validate_prompt(&prompt).is_err());
    }

    #[test]
    fn oversized_image_rejected() {
        let big = ReferenceImage::new(vec![0; MAX_REFERENCE_IMAGE_BYTES + 1], "image/jpeg");
        assert!(validate_reference_image(&big).is_err());
    }

    // -- Enumerations --

    #[test]
    fn ratio_round_trips_through_parse() {
        for ratio in AspectRatio::options_for(GenerationMode::TextToVideo) {
            assert_eq!(AspectRatio::parse(ratio.as_str()), Some(*ratio));
        }
        assert_eq!(AspectRatio::parse("16:9"), None);
    }

    #[test]
    fn duration_from_seconds() {
        assert_eq!(ClipDuration::from_seconds(5), Some(ClipDuration::Five));
        assert_eq!(ClipDuration::from_seconds(10), Some(ClipDuration::Ten));
        assert_eq!(ClipDuration::from_seconds(7), None);
    }

    #[test]
    fn status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Failed("boom".into()).is_terminal());
        assert!(JobStatus::Succeeded(OutputRef::Url("u".into())).is_terminal());
    }

    #[test]
    fn reference_image_debug_hides_bytes() {
        let dbg = format!("{:?}", image());
        assert!(dbg.contains("len: 3"));
    }
}
