//! Extraction capability seam.
//!
//! The retrieval engine never downloads or transcodes anything itself. It
//! asks an [`Extractor`] to probe and to extract. The production
//! implementation drives yt-dlp (see [`crate::download::ytdlp`]); tests plug
//! in fakes that write files of a chosen size.

use std::path::Path;
use url::Url;

use crate::download::error::ExtractError;
use crate::download::policy::FormatConstraint;

/// What a non-downloading probe learns about the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedMetadata {
    pub title: String,
    /// `None` when the source does not report one (live streams, some sites)
    pub duration_secs: Option<u64>,
}

/// What an extraction reports about the file it wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// External media extraction + transcoding.
///
/// Methods block for as long as the network and transcoding take; callers
/// run them on a blocking worker, never on the async executor.
pub trait Extractor: Send + Sync {
    /// Human-readable name, for logs
    fn name(&self) -> &str;

    /// Fetch title and duration without downloading media.
    fn probe(&self, url: &Url) -> Result<ProbedMetadata, ExtractError>;

    /// Download and transcode according to `constraint`.
    ///
    /// `output_template` ends in `<stem>.%(ext)s`; the final file must be
    /// `<stem>.<constraint.container>` in the same directory.
    fn extract(&self, url: &Url, constraint: &FormatConstraint, output_template: &Path)
        -> Result<ExtractReport, ExtractError>;
}
