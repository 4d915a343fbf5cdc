//! Texts the bot sends to users.

use indoc::formatdoc;

use grabcore::core::config::bytes_to_mb;
use grabcore::{FormatPolicy, MediaKind};

pub const CHOOSE_FORMAT: &str = "Which format do you want?";
pub const NO_LINK: &str = "Send me a link to a video (YouTube, SoundCloud, Vimeo and most other sites).";
pub const DOWNLOAD_FAILED: &str = "❌ Download failed. The media may be private, region-locked or unsupported.";
pub const BUSY: &str = "⏳ I'm busy with other downloads right now. Please try again in a minute.";
pub const LINK_EXPIRED: &str = "This link has expired. Please send it again.";
pub const BAD_CALLBACK: &str = "Unknown option";

pub fn start(ceiling_bytes: u64) -> String {
    formatdoc! {"
        👋 Hi! Send me a link and I'll send back the audio or the video.

        Files up to {limit} can be delivered. Long videos are downloaded at a lower resolution so they fit.
        ",
        limit = format_size(ceiling_bytes),
    }
}

pub fn help(ceiling_bytes: u64, policy: &FormatPolicy) -> String {
    formatdoc! {"
        How to use:
        1. Send a link to a video.
        2. Pick 🎵 Audio (MP3) or 🎬 Video (MP4).
        3. Wait for the file.

        Size limit: {limit}.{downgrade}
        ",
        limit = format_size(ceiling_bytes),
        downgrade = downgrade_note(policy),
    }
}

fn downgrade_note(policy: &FormatPolicy) -> String {
    match policy.downgrade_threshold_secs {
        Some(threshold) => format!(
            " Videos longer than {} are capped at {}p.",
            format_duration(threshold),
            policy.low_tier_height
        ),
        None => String::new(),
    }
}

/// `15 min`, `90 s`
fn format_duration(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{} s", secs)
    }
}

pub fn downloading(kind: MediaKind) -> String {
    match kind {
        MediaKind::Audio => "⏬ Downloading audio...".to_string(),
        MediaKind::Video => "⏬ Downloading video...".to_string(),
    }
}

pub fn uploading(title: &str) -> String {
    format!("⏫ Uploading \"{}\"...", title)
}

pub fn too_large(size_bytes: u64, ceiling_bytes: u64) -> String {
    format!(
        "❌ The file is {}, which is over the {} limit.",
        format_size(size_bytes),
        format_size(ceiling_bytes)
    )
}

pub fn upload_failed(error: &str) -> String {
    format!("❌ Upload failed: {}", error)
}

/// `49.5 MB`, `2000 MB`
pub fn format_size(bytes: u64) -> String {
    let mb = bytes_to_mb(bytes);
    if (mb - mb.round()).abs() < 0.05 {
        format!("{:.0} MB", mb)
    } else {
        format!("{:.1} MB", mb)
    }
}
