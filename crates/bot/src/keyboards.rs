//! Inline keyboards for each collector step.

use genrelay_core::{AspectRatio, ClipDuration, GenerationMode};

use crate::callbacks::Callback;
use crate::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Ratio buttons per row.
const RATIOS_PER_ROW: usize = 3;

fn button(text: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton {
        text: text.into(),
        callback_data: callback.encode(),
    }
}

/// One mode per row.
pub fn modes() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: GenerationMode::ALL
            .into_iter()
            .map(|mode| vec![button(mode.label(), Callback::Mode(mode))])
            .collect(),
    }
}

pub fn durations() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![ClipDuration::ALL
            .into_iter()
            .map(|d| button(format!("{} s", d.seconds()), Callback::Duration(d)))
            .collect()],
    }
}

/// Ratios the provider accepts for `mode`.
pub fn ratios(mode: GenerationMode) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: AspectRatio::options_for(mode)
            .chunks(RATIOS_PER_ROW)
            .map(|row| {
                row.iter()
                    .map(|r| button(r.as_str(), Callback::Ratio(*r)))
                    .collect()
            })
            .collect(),
    }
}
