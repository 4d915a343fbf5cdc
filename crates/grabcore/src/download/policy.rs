//! Format selection policy.
//!
//! Maps a requested kind and the probed duration to the exact constraints
//! handed to the extractor. Long videos get a lower resolution bound so the
//! result is more likely to fit under the delivery ceiling. This is only a
//! heuristic: the real size is known after transcoding, and the delivery
//! gate still checks it.

use crate::download::types::MediaKind;

/// Container produced for audio requests
pub const AUDIO_CONTAINER: &str = "mp3";
/// Container produced for video requests
pub const VIDEO_CONTAINER: &str = "mp4";

/// Concrete extractor parameters for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConstraint {
    pub kind: MediaKind,
    /// File extension of the final artifact
    pub container: &'static str,
    /// yt-dlp `-f` expression, passed through untouched
    pub selection: String,
    /// Upper bound on vertical resolution, `None` for audio or unbounded video
    pub max_height: Option<u32>,
    /// Audio bitrate tier, only set for audio
    pub audio_quality: Option<String>,
}

/// Tier settings for [`FormatPolicy::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Videos longer than this get `low_tier_height`. `None` disables the downgrade.
    pub downgrade_threshold_secs: Option<u64>,
    /// Height bound for short videos, `None` for best available
    pub high_tier_height: Option<u32>,
    pub low_tier_height: u32,
    /// e.g. "192K"
    pub audio_quality: String,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self {
            downgrade_threshold_secs: Some(900),
            high_tier_height: Some(720),
            low_tier_height: 480,
            audio_quality: "192K".to_string(),
        }
    }
}

impl FormatPolicy {
    /// Pure decision, no I/O.
    ///
    /// An unknown duration counts as short. A duration exactly at the
    /// threshold is still short.
    pub fn decide(&self, kind: MediaKind, duration_secs: Option<u64>) -> FormatConstraint {
        match kind {
            MediaKind::Audio => FormatConstraint {
                kind,
                container: AUDIO_CONTAINER,
                selection: "bestaudio/best".to_string(),
                max_height: None,
                audio_quality: Some(self.audio_quality.clone()),
            },
            MediaKind::Video => {
                let max_height = self.video_height(duration_secs);
                FormatConstraint {
                    kind,
                    container: VIDEO_CONTAINER,
                    selection: video_selection(max_height),
                    max_height,
                    audio_quality: None,
                }
            }
        }
    }

    fn video_height(&self, duration_secs: Option<u64>) -> Option<u32> {
        let duration = duration_secs.unwrap_or(0);
        match self.downgrade_threshold_secs {
            Some(threshold) if duration > threshold => Some(match self.high_tier_height {
                // never "downgrade" above the short-video bound
                Some(high) => high.min(self.low_tier_height),
                None => self.low_tier_height,
            }),
            _ => self.high_tier_height,
        }
    }
}

/// Best video+audio pair under the bound, falling back to the best single
/// file under the bound, then to anything at all.
fn video_selection(max_height: Option<u32>) -> String {
    match max_height {
        Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]/best"),
        None => "bestvideo+bestaudio/best".to_string(),
    }
}
