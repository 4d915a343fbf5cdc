use anyhow::Result;
use dotenvy::dotenv;
use std::path::Path;
use strum::IntoEnumIterator;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use url::Url;

use grabbot::cli::{Cli, Commands};
use grabbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, PendingLinks};
use grabcore::core::config::{self, RetrievalConfig};
use grabcore::core::{init_logger, log_retrieval_configuration};
use grabcore::download::ytdlp::check_ytdlp_version;
use grabcore::download::{
    DeliveryError, Extractor, GateDecision, RetrievalError, RetrievalService, YtDlpExtractor,
};
use grabcore::{AppResult, Config, MediaKind, RetrievalRequest};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::log_file_path())?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await?,
        Some(Commands::Probe { url }) => run_cli_probe(&url).await?,
        Some(Commands::Fetch {
            url,
            kind,
            output,
            no_gate,
        }) => run_cli_fetch(&url, kind, &output, no_gate).await?,
    }
    Ok(())
}

/// Run CLI probe command
async fn run_cli_probe(raw_url: &str) -> AppResult<()> {
    let url = Url::parse(raw_url)?;
    let config = RetrievalConfig::from_env()?;
    let extractor = YtDlpExtractor::new(config.extractor.clone());

    let probe_url = url.clone();
    let meta = tokio::task::spawn_blocking(move || extractor.probe(&probe_url))
        .await
        .map_err(|e| RetrievalError::WorkerFailed(e.to_string()))?
        .map_err(RetrievalError::ProbeFailed)?;

    println!("🎬 {}", meta.title);
    println!("URL:      {}", url);
    match meta.duration_secs {
        Some(d) => println!("Duration: {}:{:02}", d / 60, d % 60),
        None => println!("Duration: unknown"),
    }
    println!();

    for kind in MediaKind::iter() {
        let constraint = config.policy.decide(kind, meta.duration_secs);
        println!(
            "{:<6} → {} (max height: {}) format: {}",
            kind,
            constraint.container,
            constraint.max_height.map_or("none".to_string(), |h| format!("{}p", h)),
            constraint.selection
        );
    }
    println!("Delivery ceiling: {:.1} MB ({})", config.ceiling_mb(), config.tier);

    Ok(())
}

/// Run CLI fetch command: the bot's pipeline, with the file kept instead of uploaded
async fn run_cli_fetch(raw_url: &str, kind: MediaKind, output: &Path, no_gate: bool) -> AppResult<()> {
    let url = Url::parse(raw_url)?;
    let config = RetrievalConfig::from_env()?;
    log_retrieval_configuration(&config);

    let service = RetrievalService::from_config(&config);
    let artifact = service.retrieve(RetrievalRequest::new(url, kind)).await.into_result()?;

    if !no_gate {
        if let GateDecision::Reject {
            size_bytes,
            ceiling_bytes,
        } = config.delivery_gate().gate(&artifact)?
        {
            eprintln!("Use --no-gate to keep it anyway");
            return Err(DeliveryError::TooLarge {
                size_bytes,
                ceiling_bytes,
            }
            .into());
        }
    }

    let size = artifact.size_bytes()?;
    let kept = artifact.keep(output)?;
    println!("✅ Saved {} ({:.1} MB)", kept.display(), config::bytes_to_mb(size));
    Ok(())
}

/// Run the Telegram bot
async fn run_bot() -> AppResult<()> {
    let bot_init_start = std::time::Instant::now();
    log::info!("Starting bot...");

    // Missing token is the one fatal configuration error
    let config = Config::from_env()?;
    log_retrieval_configuration(&config.retrieval);

    check_ytdlp_version(&config.retrieval.extractor.bin).await;

    let bot = create_bot(&config)?;

    let me = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", me.username, me.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let retrieval = RetrievalService::from_config(&config.retrieval);
    log::info!(
        "Retrieval pool: {} slots, {} when full",
        retrieval.pool().capacity(),
        retrieval.admission_policy()
    );

    let handler_deps = HandlerDeps::new(
        retrieval,
        config.retrieval.delivery_gate(),
        PendingLinks::new(config.pending_link_ttl),
    );
    let handler = schema(handler_deps);

    log::info!("================================================");
    log::info!(
        "🎉 Bot initialization complete in {:.2}s",
        bot_init_start.elapsed().as_secs_f64()
    );
    log::info!("📡 Ready to receive updates!");
    log::info!("================================================");

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
