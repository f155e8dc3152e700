//! Parameter collector: gather job inputs one user action at a time.
//!
//! ```text
//! AwaitingMode ─▶ AwaitingDuration ─▶ AwaitingRatio ─▶ AwaitingPrompt ─▶ Ready
//!       │          (video modes only)        ▲                 │
//!       └──────────── text → image ──────────┘                 └─▶ AwaitingImage ─▶ Ready
//!                                                                 (image → video)
//! ```
//!
//! Each action supplies one field and advances one state. An action that
//! does not fit the current state is rejected without touching the
//! collected fields. Reaching `Ready` yields the finished [`JobRequest`]
//! and resets the collector for the next job.

use std::fmt;
use std::sync::Arc;

use genrelay_core::job::{validate_prompt, validate_reference_image};
use genrelay_core::{
    AspectRatio, ClipDuration, CoreError, GenerationMode, JobRequest, ModelCatalog,
    ReferenceImage,
};

// ---------------------------------------------------------------------------
// States, actions, errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    AwaitingMode,
    AwaitingDuration,
    AwaitingRatio,
    AwaitingPrompt,
    AwaitingImage,
    Ready,
}

impl CollectorState {
    /// What the user is asked for in this state.
    pub fn guidance(self) -> &'static str {
        match self {
            CollectorState::AwaitingMode => "Choose a generation mode:",
            CollectorState::AwaitingDuration => "Choose the clip duration:",
            CollectorState::AwaitingRatio => "Choose the aspect ratio (resolution):",
            CollectorState::AwaitingPrompt => "Send the text prompt:",
            CollectorState::AwaitingImage => "Now send the reference photo:",
            CollectorState::Ready => "All parameters are set.",
        }
    }
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectorState::AwaitingMode => "waiting for a mode",
            CollectorState::AwaitingDuration => "waiting for a duration",
            CollectorState::AwaitingRatio => "waiting for an aspect ratio",
            CollectorState::AwaitingPrompt => "waiting for a prompt",
            CollectorState::AwaitingImage => "waiting for a photo",
            CollectorState::Ready => "ready",
        })
    }
}

/// One user input.
#[derive(Debug, Clone)]
pub enum CollectorAction {
    ChooseMode(GenerationMode),
    ChooseDuration(ClipDuration),
    ChooseRatio(AspectRatio),
    SubmitPrompt(String),
    /// A photo, optionally captioned. A caption may stand in for the
    /// prompt when the photo arrives while the prompt is still awaited.
    AttachImage {
        image: ReferenceImage,
        caption: Option<String>,
    },
}

impl CollectorAction {
    fn name(&self) -> &'static str {
        match self {
            CollectorAction::ChooseMode(_) => "a mode",
            CollectorAction::ChooseDuration(_) => "a duration",
            CollectorAction::ChooseRatio(_) => "an aspect ratio",
            CollectorAction::SubmitPrompt(_) => "a text message",
            CollectorAction::AttachImage { .. } => "a photo",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// The action does not fit the current state. Nothing was changed.
    #[error("Got {action} while {state}")]
    Unexpected {
        state: CollectorState,
        action: &'static str,
    },

    /// The supplied value failed validation. Nothing was changed.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// A request was asked for before every field was set.
    #[error("Parameters incomplete: missing {}", missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
}

impl CollectorError {
    /// User-facing guidance for this rejection.
    pub fn guidance(&self) -> String {
        match self {
            CollectorError::Unexpected { state, action } => match (state, *action) {
                (CollectorState::AwaitingMode, _) => {
                    "Start by choosing the parameters with /start.".to_string()
                }
                (_, "a photo") => format!(
                    "A photo isn't needed right now. {}",
                    state.guidance()
                ),
                _ => format!("That doesn't fit here. {}", state.guidance()),
            },
            CollectorError::Invalid(CoreError::Validation(msg)) => format!("{msg}. Please try again."),
            CollectorError::Invalid(other) => format!("{other}. Please try again."),
            CollectorError::Incomplete { missing } => format!(
                "Parameters incomplete: still need {}. Use /start to choose them.",
                missing.join(", ")
            ),
        }
    }
}

/// Result of applying an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// More input is needed; the collector is now in this state.
    Awaiting(CollectorState),
    /// Every field is set. The collector has reset.
    Ready(JobRequest),
}

// ---------------------------------------------------------------------------
// ParameterCollector
// ---------------------------------------------------------------------------

/// Per-conversation state machine that gathers one [`JobRequest`].
#[derive(Debug, Clone)]
pub struct ParameterCollector {
    models: Arc<ModelCatalog>,
    state: CollectorState,
    mode: Option<GenerationMode>,
    duration: Option<ClipDuration>,
    ratio: Option<AspectRatio>,
    prompt: Option<String>,
    image: Option<ReferenceImage>,
}

impl ParameterCollector {
    pub fn new(models: Arc<ModelCatalog>) -> Self {
        Self {
            models,
            state: CollectorState::AwaitingMode,
            mode: None,
            duration: None,
            ratio: None,
            prompt: None,
            image: None,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn mode(&self) -> Option<GenerationMode> {
        self.mode
    }

    /// Whether nothing has been collected yet.
    pub fn is_pristine(&self) -> bool {
        self.state == CollectorState::AwaitingMode
            && self.mode.is_none()
            && self.duration.is_none()
            && self.ratio.is_none()
            && self.prompt.is_none()
            && self.image.is_none()
    }

    /// Discard everything collected so far.
    pub fn reset(&mut self) {
        *self = Self::new(Arc::clone(&self.models));
    }

    /// Apply one user action.
    pub fn apply(&mut self, action: CollectorAction) -> Result<Step, CollectorError> {
        match (self.state, action) {
            (CollectorState::AwaitingMode, CollectorAction::ChooseMode(mode)) => {
                self.mode = Some(mode);
                self.state = if mode.produces_video() {
                    CollectorState::AwaitingDuration
                } else {
                    CollectorState::AwaitingRatio
                };
                Ok(Step::Awaiting(self.state))
            }
            (CollectorState::AwaitingDuration, CollectorAction::ChooseDuration(duration)) => {
                self.duration = Some(duration);
                self.state = CollectorState::AwaitingRatio;
                Ok(Step::Awaiting(self.state))
            }
            (CollectorState::AwaitingRatio, CollectorAction::ChooseRatio(ratio)) => {
                let mode = self.require_mode()?;
                if !ratio.supports(mode) {
                    return Err(CoreError::Validation(format!(
                        "Aspect ratio {ratio} is not available for {}",
                        mode.label()
                    ))
                    .into());
                }
                self.ratio = Some(ratio);
                self.state = CollectorState::AwaitingPrompt;
                Ok(Step::Awaiting(self.state))
            }
            (CollectorState::AwaitingPrompt, CollectorAction::SubmitPrompt(text)) => {
                let prompt = validate_prompt(&text)?;
                if self.require_mode()?.needs_reference_image() {
                    self.prompt = Some(prompt);
                    self.state = CollectorState::AwaitingImage;
                    return Ok(Step::Awaiting(self.state));
                }
                self.complete(prompt, None)
            }
            (CollectorState::AwaitingPrompt, CollectorAction::AttachImage { image, caption }) => {
                let caption = caption.as_deref().map(str::trim).unwrap_or_default();
                if !self.require_mode()?.needs_reference_image() || caption.is_empty() {
                    return Err(CollectorError::Unexpected {
                        state: self.state,
                        action: "a photo",
                    });
                }
                let prompt = validate_prompt(caption)?;
                validate_reference_image(&image)?;
                self.complete(prompt, Some(image))
            }
            (CollectorState::AwaitingImage, CollectorAction::AttachImage { image, .. }) => {
                validate_reference_image(&image)?;
                let prompt = self.prompt.clone().ok_or_else(|| CollectorError::Incomplete {
                    missing: vec!["prompt"],
                })?;
                self.complete(prompt, Some(image))
            }
            (state, action) => Err(CollectorError::Unexpected {
                state,
                action: action.name(),
            }),
        }
    }

    /// Build the request from what has been collected so far.
    ///
    /// Fails with [`CollectorError::Incomplete`] (and changes nothing) when
    /// a required field is still missing.
    pub fn finish(&mut self) -> Result<JobRequest, CollectorError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(CollectorError::Incomplete { missing });
        }
        let prompt = self.prompt.clone().unwrap_or_default();
        match self.complete(prompt, self.image.clone())? {
            Step::Ready(request) => Ok(request),
            Step::Awaiting(_) => Err(CollectorError::Incomplete {
                missing: self.missing_fields(),
            }),
        }
    }

    /// Names of the fields still needed for the current mode.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let Some(mode) = self.mode else {
            return vec!["mode", "aspect ratio", "prompt"];
        };
        if mode.produces_video() && self.duration.is_none() {
            missing.push("duration");
        }
        if self.ratio.is_none() {
            missing.push("aspect ratio");
        }
        if self.prompt.is_none() {
            missing.push("prompt");
        }
        if mode.needs_reference_image() && self.image.is_none() {
            missing.push("photo");
        }
        missing
    }

    fn require_mode(&self) -> Result<GenerationMode, CollectorError> {
        self.mode.ok_or_else(|| CollectorError::Incomplete {
            missing: vec!["mode"],
        })
    }

    /// Build the request; on success reset and return it.
    fn complete(
        &mut self,
        prompt: String,
        image: Option<ReferenceImage>,
    ) -> Result<Step, CollectorError> {
        let mode = self.require_mode()?;
        let ratio = self.ratio.ok_or_else(|| CollectorError::Incomplete {
            missing: vec!["aspect ratio"],
        })?;
        let duration = if mode.produces_video() {
            Some(self.duration.ok_or_else(|| CollectorError::Incomplete {
                missing: vec!["duration"],
            })?)
        } else {
            None
        };

        let request = JobRequest::new(
            mode,
            &prompt,
            image,
            duration,
            ratio,
            self.models.model_for(mode),
        )?;
        self.reset();
        Ok(Step::Ready(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> ParameterCollector {
        ParameterCollector::new(Arc::new(ModelCatalog::default()))
    }

    fn photo() -> ReferenceImage {
        ReferenceImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
    }

    fn ready(step: Step) -> JobRequest {
        match step {
            Step::Ready(req) => req,
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    // -- Happy paths --

    #[test]
    fn text_to_video_flow() {
        let mut c = collector();
        assert_eq!(
            c.apply(CollectorAction::ChooseMode(GenerationMode::TextToVideo)).unwrap(),
            Step::Awaiting(CollectorState::AwaitingDuration)
        );
        assert_eq!(
            c.apply(CollectorAction::ChooseDuration(ClipDuration::Five)).unwrap(),
            Step::Awaiting(CollectorState::AwaitingRatio)
        );
        assert_eq!(
            c.apply(CollectorAction::ChooseRatio(AspectRatio::Landscape1280x720)).unwrap(),
            Step::Awaiting(CollectorState::AwaitingPrompt)
        );
        let req = ready(c.apply(CollectorAction::SubmitPrompt("  a cat  ".into())).unwrap());

        assert_eq!(req.mode(), GenerationMode::TextToVideo);
        assert_eq!(req.prompt_text(), "a cat");
        assert_eq!(req.duration(), Some(ClipDuration::Five));
        assert_eq!(req.model_name(), "gen4_turbo");
        assert!(req.reference_image().is_none());
        assert!(c.is_pristine(), "collector resets after Ready");
    }

    #[test]
    fn image_to_video_flow_waits_for_photo() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::ImageToVideo)).unwrap();
        c.apply(CollectorAction::ChooseDuration(ClipDuration::Ten)).unwrap();
        c.apply(CollectorAction::ChooseRatio(AspectRatio::Portrait720x1280)).unwrap();
        assert_eq!(
            c.apply(CollectorAction::SubmitPrompt("pan left".into())).unwrap(),
            Step::Awaiting(CollectorState::AwaitingImage)
        );
        let req = ready(
            c.apply(CollectorAction::AttachImage {
                image: photo(),
                caption: None,
            })
            .unwrap(),
        );
        assert_eq!(req.prompt_text(), "pan left");
        assert!(req.reference_image().is_some());
    }

    #[test]
    fn captioned_photo_supplies_prompt_and_image() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::ImageToVideo)).unwrap();
        c.apply(CollectorAction::ChooseDuration(ClipDuration::Five)).unwrap();
        c.apply(CollectorAction::ChooseRatio(AspectRatio::Square960x960)).unwrap();
        let req = ready(
            c.apply(CollectorAction::AttachImage {
                image: photo(),
                caption: Some("slow zoom".into()),
            })
            .unwrap(),
        );
        assert_eq!(req.prompt_text(), "slow zoom");
    }

    #[test]
    fn text_to_image_skips_duration() {
        let mut c = collector();
        assert_eq!(
            c.apply(CollectorAction::ChooseMode(GenerationMode::TextToImage)).unwrap(),
            Step::Awaiting(CollectorState::AwaitingRatio)
        );
        c.apply(CollectorAction::ChooseRatio(AspectRatio::Square1024x1024)).unwrap();
        let req = ready(c.apply(CollectorAction::SubmitPrompt("a castle".into())).unwrap());
        assert_eq!(req.duration(), None);
        assert_eq!(req.model_name(), "gen4_image");
    }

    // -- Rejections --

    #[test]
    fn photo_out_of_turn_is_rejected_without_mutation() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::TextToVideo)).unwrap();
        let before = c.state();

        let err = c
            .apply(CollectorAction::AttachImage {
                image: photo(),
                caption: Some("hello".into()),
            })
            .unwrap_err();

        assert!(matches!(err, CollectorError::Unexpected { .. }));
        assert!(err.guidance().contains("photo isn't needed"));
        assert_eq!(c.state(), before);
        assert_eq!(c.mode(), Some(GenerationMode::TextToVideo));
    }

    #[test]
    fn uncaptioned_photo_before_prompt_is_rejected() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::ImageToVideo)).unwrap();
        c.apply(CollectorAction::ChooseDuration(ClipDuration::Five)).unwrap();
        c.apply(CollectorAction::ChooseRatio(AspectRatio::Square960x960)).unwrap();
        let err = c
            .apply(CollectorAction::AttachImage {
                image: photo(),
                caption: None,
            })
            .unwrap_err();
        assert!(matches!(err, CollectorError::Unexpected { .. }));
        assert_eq!(c.state(), CollectorState::AwaitingPrompt);
    }

    #[test]
    fn text_before_mode_is_rejected() {
        let mut c = collector();
        let err = c.apply(CollectorAction::SubmitPrompt("hi".into())).unwrap_err();
        assert!(err.guidance().contains("/start"));
        assert!(c.is_pristine());
    }

    #[test]
    fn ratio_for_wrong_mode_is_rejected() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::TextToImage)).unwrap();
        let err = c
            .apply(CollectorAction::ChooseRatio(AspectRatio::Wide1584x672))
            .unwrap_err();
        assert!(matches!(err, CollectorError::Invalid(_)));
        assert_eq!(c.state(), CollectorState::AwaitingRatio);
    }

    #[test]
    fn empty_prompt_does_not_advance() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::TextToImage)).unwrap();
        c.apply(CollectorAction::ChooseRatio(AspectRatio::Square1024x1024)).unwrap();
        assert!(c.apply(CollectorAction::SubmitPrompt("   ".into())).is_err());
        assert_eq!(c.state(), CollectorState::AwaitingPrompt);
    }

    #[test]
    fn duplicate_mode_choice_is_rejected() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::TextToVideo)).unwrap();
        assert!(c
            .apply(CollectorAction::ChooseMode(GenerationMode::TextToImage))
            .is_err());
        assert_eq!(c.mode(), Some(GenerationMode::TextToVideo));
    }

    // -- finish() --

    #[test]
    fn finish_before_complete_is_incomplete() {
        let mut c = collector();
        c.apply(CollectorAction::ChooseMode(GenerationMode::TextToVideo)).unwrap();
        let err = c.finish().unwrap_err();
        match err {
            CollectorError::Incomplete { missing } => {
                assert_eq!(missing, vec!["duration", "aspect ratio", "prompt"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(c.state(), CollectorState::AwaitingDuration);
    }

    #[test]
    fn finish_on_fresh_collector_lists_everything() {
        let mut c = collector();
        let err = c.finish().unwrap_err();
        assert!(err.guidance().starts_with("Parameters incomplete"));
    }

    // -- Invariant over all flows --

    #[test]
    fn built_requests_respect_mode_invariants() {
        for mode in GenerationMode::ALL {
            let mut c = collector();
            c.apply(CollectorAction::ChooseMode(mode)).unwrap();
            if mode.produces_video() {
                c.apply(CollectorAction::ChooseDuration(ClipDuration::Ten)).unwrap();
            }
            let ratio = AspectRatio::options_for(mode)[0];
            c.apply(CollectorAction::ChooseRatio(ratio)).unwrap();
            let mut step = c.apply(CollectorAction::SubmitPrompt("prompt".into())).unwrap();
            if let Step::Awaiting(CollectorState::AwaitingImage) = step {
                step = c
                    .apply(CollectorAction::AttachImage {
                        image: photo(),
                        caption: None,
                    })
                    .unwrap();
            }
            let req = ready(step);
            assert_eq!(
                req.reference_image().is_some(),
                mode == GenerationMode::ImageToVideo
            );
            assert_eq!(req.duration().is_some(), mode != GenerationMode::TextToImage);
        }
    }
}
