//! Inline-keyboard callback data codec.
//!
//! Each button carries `<kind>:<value>`:
//! `mode:t2v|i2v|t2i`, `duration:5|10`, `ratio:<W:H>`.

use genrelay_core::{AspectRatio, ClipDuration, GenerationMode};
use genrelay_pipeline::CollectorAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Mode(GenerationMode),
    Duration(ClipDuration),
    Ratio(AspectRatio),
}

impl Callback {
    pub fn encode(self) -> String {
        match self {
            Callback::Mode(mode) => format!("mode:{}", mode_code(mode)),
            Callback::Duration(d) => format!("duration:{}", d.seconds()),
            Callback::Ratio(r) => format!("ratio:{}", r.as_str()),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, value) = data.split_once(':')?;
        match kind {
            "mode" => match value {
                "t2v" => Some(Callback::Mode(GenerationMode::TextToVideo)),
                "i2v" => Some(Callback::Mode(GenerationMode::ImageToVideo)),
                "t2i" => Some(Callback::Mode(GenerationMode::TextToImage)),
                _ => None,
            },
            "duration" => value
                .parse()
                .ok()
                .and_then(ClipDuration::from_seconds)
                .map(Callback::Duration),
            "ratio" => AspectRatio::parse(value).map(Callback::Ratio),
            _ => None,
        }
    }

    /// Confirmation shown in place of the keyboard once a choice is made.
    pub fn confirmation(self) -> String {
        match self {
            Callback::Mode(mode) => format!("Mode: {}", mode.label()),
            Callback::Duration(d) => format!("Duration: {} s", d.seconds()),
            Callback::Ratio(r) => format!("Aspect ratio: {r}"),
        }
    }

    pub fn into_action(self) -> CollectorAction {
        match self {
            Callback::Mode(mode) => CollectorAction::ChooseMode(mode),
            Callback::Duration(d) => CollectorAction::ChooseDuration(d),
            Callback::Ratio(r) => CollectorAction::ChooseRatio(r),
        }
    }
}

fn mode_code(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::TextToVideo => "t2v",
        GenerationMode::ImageToVideo => "i2v",
        GenerationMode::TextToImage => "t2i",
    }
}
