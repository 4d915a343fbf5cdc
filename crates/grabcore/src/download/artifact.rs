//! Artifact lifecycle.
//!
//! Each retrieval gets a random file stem and an [`ArtifactGuard`] that owns
//! every file named after it. Dropping the guard deletes them, so cleanup
//! happens on every exit path: delivery success or failure, gate rejection,
//! early return, panic.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::download::pool::WorkerSlot;
use crate::download::types::MediaKind;

/// Random per-request file stem, e.g. `temp_4f0c...`.
///
/// Never derived from user input, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileStem(String);

impl FileStem {
    pub fn generate() -> Self {
        Self(format!("temp_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `file_name` belongs to this stem: the final file, the
    /// extractor's `.part`/`.ytdl` files and per-format intermediates
    /// (`<stem>.f137.mp4`).
    pub fn owns(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

impl std::fmt::Display for FileStem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owns every file of one retrieval and deletes them on drop.
#[derive(Debug)]
pub struct ArtifactGuard {
    dir: PathBuf,
    stem: FileStem,
    /// Set once the final file has been moved out on purpose
    released: Option<PathBuf>,
}

impl ArtifactGuard {
    /// Allocates a fresh stem under `dir`, creating the directory if needed.
    pub fn acquire(dir: &Path) -> std::io::Result<Self> {
        fs_err::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stem: FileStem::generate(),
            released: None,
        })
    }

    pub fn stem(&self) -> &FileStem {
        &self.stem
    }

    /// `<dir>/<stem>.%(ext)s`, for the extractor
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.stem))
    }

    /// `<dir>/<stem>.<container>`, where the final file must end up
    pub fn expected_path(&self, container: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, container))
    }

    /// Files currently on disk under this stem
    pub fn produced_files(&self) -> Vec<PathBuf> {
        let entries = match fs_err::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("[{}] cannot list {}: {}", self.stem, self.dir.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_str().is_some_and(|name| self.stem.owns(name)))
            .map(|entry| entry.path())
            .collect()
    }

    /// Deletes every file under this stem. Returns how many were removed.
    /// Safe to call more than once.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        for path in self.produced_files() {
            match fs_err::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::error!("[{}] failed to remove {}: {}", self.stem, path.display(), e),
            }
        }
        if removed > 0 {
            log::debug!("[{}] removed {} file(s)", self.stem, removed);
        }
        removed
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        self.cleanup();
        if let Some(kept) = &self.released {
            log::debug!("[{}] kept {}", self.stem, kept.display());
        }
    }
}

/// A produced media file, ready for the delivery gate.
///
/// Holds the guard (file is deleted when the artifact is dropped) and, when
/// it came from a [`crate::download::RetrievalService`], the worker slot, so
/// the slot stays taken until the file is gone.
#[derive(Debug)]
pub struct Artifact {
    guard: ArtifactGuard,
    path: PathBuf,
    title: String,
    kind: MediaKind,
    duration_secs: Option<u64>,
    report: crate::download::extractor::ExtractReport,
    slot: Option<WorkerSlot>,
}

impl Artifact {
    pub(crate) fn new(
        guard: ArtifactGuard,
        path: PathBuf,
        title: String,
        kind: MediaKind,
        duration_secs: Option<u64>,
        report: crate::download::extractor::ExtractReport,
    ) -> Self {
        Self {
            guard,
            path,
            title,
            kind,
            duration_secs,
            report,
            slot: None,
        }
    }

    pub(crate) fn attach_slot(&mut self, slot: WorkerSlot) {
        self.slot = Some(slot);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn stem(&self) -> &FileStem {
        self.guard.stem()
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.duration_secs
    }

    pub fn width(&self) -> Option<u32> {
        self.report.width
    }

    pub fn height(&self) -> Option<u32> {
        self.report.height
    }

    /// Current size on disk
    pub fn size_bytes(&self) -> std::io::Result<u64> {
        Ok(fs_err::metadata(&self.path)?.len())
    }

    /// Moves the final file into `dest_dir` under a readable name and
    /// releases it from cleanup. Intermediates are still deleted.
    pub fn keep(mut self, dest_dir: &Path) -> std::io::Result<PathBuf> {
        fs_err::create_dir_all(dest_dir)?;
        let file_name = format!("{}.{}", safe_file_name(&self.title), self.kind_extension());
        let dest = dest_dir.join(file_name);

        if fs_err::rename(&self.path, &dest).is_err() {
            // different filesystem
            fs_err::copy(&self.path, &dest)?;
            fs_err::remove_file(&self.path)?;
        }
        self.guard.released = Some(dest.clone());
        Ok(dest)
    }

    fn kind_extension(&self) -> &str {
        self.path.extension().and_then(|e| e.to_str()).unwrap_or("bin")
    }
}

/// Makes a title usable as a file name.
pub fn safe_file_name(title: &str) -> String {
    let mut result = String::with_capacity(title.len());

    for c in title.chars() {
        match c {
            '/' | '\\' | ':' | '*' | '?' | '<' | '>' | '|' => result.push('_'),
            '"' => result.push('\''),
            c if c.is_control() => result.push('_'),
            _ => result.push(c),
        }
    }

    let trimmed: String = result
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .chars()
        .take(150)
        .collect();

    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed
    }
}
