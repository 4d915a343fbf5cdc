//! Shared fakes for the retrieval integration tests
//!
//! `FakeExtractor` writes real files of a chosen size so the gate and the
//! cleanup guard see exactly what production would.

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use grabcore::download::ytdlp_errors::YtDlpErrorType;
use grabcore::download::{ExtractError, ExtractReport, Extractor, FormatConstraint, ProbedMetadata, UploadItem, Uploader};
use grabcore::MediaKind;

pub const MB: u64 = 1024 * 1024;

pub fn test_url() -> Url {
    Url::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap()
}

/// Files currently in `dir`
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Writes an intermediate and the final file
    Produce,
    /// Writes a partial file, then fails like yt-dlp does
    Fail,
    /// Reports success without writing the final file
    NoFile,
    /// Panics mid-extraction, after writing an intermediate
    Panic,
}

#[derive(Debug)]
pub struct FakeExtractor {
    pub title: String,
    pub duration_secs: Option<u64>,
    pub probe_fails: bool,
    pub mode: ExtractMode,
    pub output_bytes: u64,
    pub delay: Duration,
    /// Every constraint handed to `extract`
    pub seen: Mutex<Vec<FormatConstraint>>,
    /// Every output template handed to `extract`
    pub templates: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    pub fn new(duration_secs: Option<u64>, output_bytes: u64) -> Self {
        Self {
            title: "Test Video".to_string(),
            duration_secs,
            probe_fails: false,
            mode: ExtractMode::Produce,
            output_bytes,
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
            templates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_probe_failure(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn constraints(&self) -> Vec<FormatConstraint> {
        self.seen.lock().unwrap().clone()
    }

    pub fn output_templates(&self) -> Vec<PathBuf> {
        self.templates.lock().unwrap().clone()
    }
}

fn failure(stage: &'static str, stderr: &str) -> ExtractError {
    ExtractError::Failed {
        stage,
        code: Some(1),
        kind: YtDlpErrorType::VideoUnavailable,
        stderr: stderr.to_string(),
    }
}

/// Sparse file of the given length
fn write_sized(path: &Path, bytes: u64) {
    let file = File::create(path).unwrap();
    file.set_len(bytes).unwrap();
}

impl Extractor for FakeExtractor {
    fn name(&self) -> &str {
        "fake"
    }

    fn probe(&self, _url: &Url) -> Result<ProbedMetadata, ExtractError> {
        if self.probe_fails {
            return Err(failure("probe", "ERROR: [youtube] x: Video unavailable"));
        }
        Ok(ProbedMetadata {
            title: self.title.clone(),
            duration_secs: self.duration_secs,
        })
    }

    fn extract(
        &self,
        _url: &Url,
        constraint: &FormatConstraint,
        output_template: &Path,
    ) -> Result<ExtractReport, ExtractError> {
        self.seen.lock().unwrap().push(constraint.clone());
        self.templates.lock().unwrap().push(output_template.to_path_buf());

        let template = output_template.to_string_lossy();
        let intermediate = PathBuf::from(template.replace("%(ext)s", "f251.webm"));
        let final_path = PathBuf::from(template.replace("%(ext)s", constraint.container));

        std::thread::sleep(self.delay);

        match self.mode {
            ExtractMode::Produce => {
                write_sized(&intermediate, 1024);
                write_sized(&final_path, self.output_bytes);
                Ok(ExtractReport {
                    width: Some(1280),
                    height: constraint.max_height.or(Some(1080)),
                })
            }
            ExtractMode::Fail => {
                write_sized(&PathBuf::from(format!("{}.part", final_path.display())), 4096);
                Err(failure("extract", "ERROR: [youtube] x: Video unavailable"))
            }
            ExtractMode::NoFile => {
                write_sized(&intermediate, 1024);
                Ok(ExtractReport::default())
            }
            ExtractMode::Panic => {
                write_sized(&intermediate, 1024);
                panic!("extractor crashed");
            }
        }
    }
}

/// One recorded upload attempt
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub title: String,
    /// Whether the file was on disk when the upload ran
    pub existed: bool,
    pub height: Option<u32>,
}

#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub fail_with: Option<String>,
    pub uploads: Mutex<Vec<UploadRecord>>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, item: UploadItem<'_>) -> anyhow::Result<()> {
        self.uploads.lock().unwrap().push(UploadRecord {
            path: item.path.to_path_buf(),
            kind: item.kind,
            title: item.title.to_string(),
            existed: item.path.is_file(),
            height: item.height,
        });
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}
