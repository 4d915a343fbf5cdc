use url::Url;

/// Output kind a user can ask for.
///
/// The set is closed: anything else is rejected while parsing (CLI argument,
/// callback data) and never reaches the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MediaKind {
    /// Audio only, transcoded to mp3
    Audio,
    /// Video with audio, merged into mp4
    Video,
}

impl MediaKind {
    /// Short tag used in inline-button callback data.
    pub fn tag(self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mp3" => Some(MediaKind::Audio),
            "mp4" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// One user request: created when a format is chosen, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    url: Url,
    kind: MediaKind,
}

impl RetrievalRequest {
    pub fn new(url: Url, kind: MediaKind) -> Self {
        Self { url, kind }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}
