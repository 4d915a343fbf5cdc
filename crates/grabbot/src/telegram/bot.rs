//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use grabcore::Config;
use grabcore::core::DeploymentTier;

/// HTTP timeout for Bot API calls. Uploads to a local Bot API server can
/// take minutes for files near the 2 GB limit.
const STANDARD_API_TIMEOUT: Duration = Duration::from_secs(120);
const LOCAL_API_TIMEOUT: Duration = Duration::from_secs(900);

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "I can do this:")]
pub enum Command {
    #[command(description = "what this bot does")]
    Start,
    #[command(description = "how to use it and the size limit")]
    Help,
}

/// Creates a Bot instance, pointed at `BOT_API_URL` when one is configured.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the HTTP client
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(api_timeout(config.tier())).build()?;
    let bot = Bot::with_client(config.bot_token.expose_secret(), client);

    let bot = match &config.api_url {
        Some(url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    };

    Ok(bot)
}

/// A `BOT_API_URL` that still points at api.telegram.org keeps the standard timeout.
pub fn api_timeout(tier: DeploymentTier) -> Duration {
    match tier {
        DeploymentTier::LocalApi => LOCAL_API_TIMEOUT,
        DeploymentTier::Standard => STANDARD_API_TIMEOUT,
    }
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
