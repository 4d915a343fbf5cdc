//! The production [`Extractor`], powered by yt-dlp.
//!
//! yt-dlp does the site-specific extraction and hands transcoding to ffmpeg.
//! This module only builds command lines, runs them with a timeout and reads
//! back what they print.

use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use url::Url;

use crate::core::config::ExtractorConfig;
use crate::core::process::{run_blocking_with_timeout, run_with_timeout, ProcessError};
use crate::download::error::ExtractError;
use crate::download::extractor::{ExtractReport, Extractor, ProbedMetadata};
use crate::download::policy::FormatConstraint;
use crate::download::types::MediaKind;
use crate::download::ytdlp_errors::{analyze_ytdlp_error, summarize_stderr};

/// Printed by yt-dlp once the final file is in place
const DIMENSIONS_TEMPLATE: &str = "after_move:%(width)s|%(height)s";

/// Fields read from `--dump-single-json`
#[derive(Debug, Deserialize)]
struct ProbeJson {
    title: Option<String>,
    duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    config: ExtractorConfig,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Arguments shared by probe and extraction
    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout.as_secs().to_string(),
        ];
        if let Some(client) = &self.config.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }
        args
    }

    pub fn probe_args(&self, url: &Url) -> Vec<String> {
        let mut args = vec!["--dump-single-json".to_string(), "--skip-download".to_string()];
        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }

    pub fn extract_args(&self, url: &Url, constraint: &FormatConstraint, output_template: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            constraint.selection.clone(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
            "--no-part".to_string(),
            "--no-mtime".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            DIMENSIONS_TEMPLATE.to_string(),
        ];

        match constraint.kind {
            MediaKind::Audio => {
                args.extend([
                    "--extract-audio".to_string(),
                    "--audio-format".to_string(),
                    constraint.container.to_string(),
                ]);
                if let Some(quality) = &constraint.audio_quality {
                    args.push("--audio-quality".to_string());
                    args.push(quality.clone());
                }
            }
            MediaKind::Video => {
                // remux covers single-file fallbacks that skip the merger
                args.extend([
                    "--merge-output-format".to_string(),
                    constraint.container.to_string(),
                    "--remux-video".to_string(),
                    constraint.container.to_string(),
                ]);
            }
        }

        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }

    fn run(&self, stage: &'static str, args: &[String], timeout: Duration) -> Result<Output, ExtractError> {
        log::debug!("{} {}: {} {}", self.name(), stage, self.config.bin, args.join(" "));

        let output = run_blocking_with_timeout(Command::new(&self.config.bin).args(args), timeout)
            .map_err(|source| ExtractError::Process { stage, source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed {
                stage,
                code: output.status.code(),
                kind: analyze_ytdlp_error(&stderr),
                stderr: summarize_stderr(&stderr),
            });
        }
        Ok(output)
    }
}

impl Extractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn probe(&self, url: &Url) -> Result<ProbedMetadata, ExtractError> {
        let output = self.run("probe", &self.probe_args(url), self.config.probe_timeout)?;
        parse_probe_output(&output.stdout)
    }

    fn extract(
        &self,
        url: &Url,
        constraint: &FormatConstraint,
        output_template: &Path,
    ) -> Result<ExtractReport, ExtractError> {
        let args = self.extract_args(url, constraint, output_template);
        let output = self.run("extract", &args, self.config.extract_timeout)?;
        Ok(parse_dimensions(&String::from_utf8_lossy(&output.stdout)))
    }
}

pub fn parse_probe_output(stdout: &[u8]) -> Result<ProbedMetadata, ExtractError> {
    let json: ProbeJson = serde_json::from_slice(stdout).map_err(|e| ExtractError::BadProbeOutput(e.to_string()))?;

    let title = json
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let duration_secs = json
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round() as u64);

    Ok(ProbedMetadata { title, duration_secs })
}

/// Reads the last `W|H` line printed by [`DIMENSIONS_TEMPLATE`]. yt-dlp prints
/// `NA` for unknown fields.
pub fn parse_dimensions(stdout: &str) -> ExtractReport {
    let Some(line) = stdout.lines().rev().map(str::trim).find(|l| l.contains('|')) else {
        return ExtractReport::default();
    };

    let mut parts = line.splitn(2, '|');
    let width = parts.next().and_then(|w| w.trim().parse().ok());
    let height = parts.next().and_then(|h| h.trim().parse().ok());
    ExtractReport { width, height }
}

/// Logs the installed yt-dlp version at startup.
///
/// A missing binary is only a warning: the bot still starts, and every
/// download fails cleanly until the binary is installed.
pub async fn check_ytdlp_version(bin: &str) -> Option<String> {
    log::info!("Checking yt-dlp version...");

    let mut cmd = TokioCommand::new(bin);
    cmd.arg("--version");

    match run_with_timeout(&mut cmd, Duration::from_secs(10)).await {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            log::info!("Current yt-dlp version: {}", version);
            Some(version)
        }
        Ok(output) => {
            log::warn!(
                "yt-dlp --version exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Err(ProcessError::Spawn { program, source }) => {
            log::warn!("⚠️  {} not found ({}). Downloads will fail until it is installed.", program, source);
            None
        }
        Err(e) => {
            log::warn!("Failed to get yt-dlp version: {}", e);
            None
        }
    }
}
