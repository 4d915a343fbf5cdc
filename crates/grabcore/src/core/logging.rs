//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup diagnostics for the retrieval settings

use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::path::Path;

use crate::core::config::RetrievalConfig;
use crate::core::error::AppResult;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file (truncated on start)
pub fn init_logger(log_file_path: &Path) -> AppResult<()> {
    let log_file = fs_err::File::create(log_file_path)?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])?;

    Ok(())
}

/// Logs the effective retrieval settings at application startup
///
/// The numbers differ per deployment tier and can be overridden one by one,
/// so the resolved values are printed once to make a misconfiguration obvious.
pub fn log_retrieval_configuration(config: &RetrievalConfig) {
    let policy = &config.policy;

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Retrieval configuration (tier: {})", config.tier);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("  extractor:        {}", config.extractor.bin);
    log::info!("  work dir:         {}", config.work_dir.display());
    log::info!(
        "  timeouts:         socket {}s, probe {}s, extract {}s",
        config.extractor.socket_timeout.as_secs(),
        config.extractor.probe_timeout.as_secs(),
        config.extractor.extract_timeout.as_secs()
    );
    log::info!("  probe required:   {}", config.probe_required);
    match policy.downgrade_threshold_secs {
        Some(threshold) => log::info!(
            "  video tiers:      {} up to {}s, {}p beyond",
            height_label(policy.high_tier_height),
            threshold,
            policy.low_tier_height
        ),
        None => log::info!(
            "  video tiers:      {} (downgrade disabled)",
            height_label(policy.high_tier_height)
        ),
    }
    log::info!("  audio:            mp3 @ {}", policy.audio_quality);
    log::info!("  delivery ceiling: {:.1} MB", config.ceiling_mb());
    log::info!(
        "  worker slots:     {} ({} when full)",
        config.max_concurrent,
        config.admission
    );

    if !config.work_dir.exists() {
        log::warn!(
            "⚠️  Work dir {} does not exist yet; it will be created on first download",
            config.work_dir.display()
        );
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn height_label(height: Option<u32>) -> String {
    match height {
        Some(h) => format!("{}p", h),
        None => "best".to_string(),
    }
}
