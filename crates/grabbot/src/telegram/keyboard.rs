//! Format-choice keyboard and its callback data.
//!
//! Callback data is `dl:<tag>:<pending id>`, e.g. `dl:mp4:3f9a0c1b2d4e`.
//! Telegram caps callback data at 64 bytes, which is why the URL itself stays
//! in [`crate::telegram::PendingLinks`].

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use grabcore::MediaKind;

const CALLBACK_PREFIX: &str = "dl";

/// A parsed format-choice callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChoice {
    pub kind: MediaKind,
    pub pending_id: String,
}

pub fn callback_data(kind: MediaKind, pending_id: &str) -> String {
    format!("{}:{}:{}", CALLBACK_PREFIX, kind.tag(), pending_id)
}

/// Parses callback data produced by [`callback_data`]. Unknown kinds and
/// foreign prefixes give `None`.
pub fn parse_callback(data: &str) -> Option<FormatChoice> {
    let mut parts = data.splitn(3, ':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let kind = MediaKind::from_tag(parts.next()?)?;
    let pending_id = parts.next()?;
    if pending_id.is_empty() {
        return None;
    }
    Some(FormatChoice {
        kind,
        pending_id: pending_id.to_string(),
    })
}

/// Whether this callback belongs to the format keyboard
pub fn is_format_callback(data: &str) -> bool {
    data.starts_with(CALLBACK_PREFIX) && data[CALLBACK_PREFIX.len()..].starts_with(':')
}

pub fn format_keyboard(pending_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🎵 Audio (MP3)", callback_data(MediaKind::Audio, pending_id)),
        InlineKeyboardButton::callback("🎬 Video (MP4)", callback_data(MediaKind::Video, pending_id)),
    ]])
}
