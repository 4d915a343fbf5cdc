//! Process-wide settings, read once at startup.
//!
//! Every value comes from an environment variable (a `.env` file is loaded by
//! the binary before this runs). Nothing here is a global: `Config::from_env`
//! builds a value the caller owns and hands to whoever needs it. Parsing goes
//! through a lookup function so tests can feed their own values.
//!
//! Numbers that differ between deployments (timeouts, resolution tiers, the
//! delivery ceiling) default per [`DeploymentTier`] and can each be overridden.

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::download::gate::DeliveryGate;
use crate::download::policy::FormatPolicy;
use crate::download::pool::AdmissionPolicy;

/// Host of the public Bot API. Any other host means a self-hosted server.
pub const STANDARD_API_HOST: &str = "api.telegram.org";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Values that switch an optional limit off.
const OFF_VALUES: &[&str] = &["0", "off", "none", "best", "unlimited"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BOT_TOKEN (or TELOXIDE_TOKEN) environment variable not set")]
    MissingToken,

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Where uploads go, which decides how large a delivered file may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeploymentTier {
    /// api.telegram.org with its 50 MB upload limit
    Standard,
    /// Self-hosted Bot API server, uploads up to 2000 MB
    LocalApi,
}

impl DeploymentTier {
    /// Picks the tier from the configured Bot API URL.
    pub fn from_api_url(api_url: Option<&Url>) -> Self {
        match api_url.and_then(Url::host_str) {
            Some(host) if host != STANDARD_API_HOST => Self::LocalApi,
            _ => Self::Standard,
        }
    }

    /// 49.5 MB leaves room for multipart overhead under the 50 MB hard limit.
    pub fn default_ceiling_mb(self) -> f64 {
        match self {
            Self::Standard => 49.5,
            Self::LocalApi => 2000.0,
        }
    }

    pub fn default_socket_timeout_secs(self) -> u64 {
        match self {
            Self::Standard => 30,
            Self::LocalApi => 60,
        }
    }

    pub fn default_extract_timeout_secs(self) -> u64 {
        match self {
            Self::Standard => 600,
            Self::LocalApi => 3600,
        }
    }

    /// Height bound for short videos. `None` means best available.
    pub fn default_high_tier_height(self) -> Option<u32> {
        match self {
            Self::Standard => Some(720),
            Self::LocalApi => None,
        }
    }

    /// Whether a failed probe fails the whole request.
    pub fn default_probe_required(self) -> bool {
        matches!(self, Self::Standard)
    }
}

/// yt-dlp invocation settings
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Extractor binary, `YTDL_BIN`
    pub bin: String,
    /// Passed to the extractor as `--socket-timeout`
    pub socket_timeout: Duration,
    /// Wall-clock bound for the metadata probe process
    pub probe_timeout: Duration,
    /// Wall-clock bound for download + transcode
    pub extract_timeout: Duration,
    /// `youtube:player_client=...` extractor argument
    pub player_client: Option<String>,
}

/// Everything the retrieval engine needs. Does not require a bot token, so
/// the CLI subcommands can run it on their own.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub tier: DeploymentTier,
    /// Directory that holds artifacts while they exist
    pub work_dir: PathBuf,
    pub probe_required: bool,
    pub policy: FormatPolicy,
    pub extractor: ExtractorConfig,
    /// Largest file the delivery gate lets through
    pub ceiling_bytes: u64,
    /// Worker slots for concurrent retrievals
    pub max_concurrent: usize,
    pub admission: AdmissionPolicy,
}

impl RetrievalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tier = DeploymentTier::from_api_url(parse_api_url(lookup)?.as_ref());

        let socket_timeout_secs = parse_or(lookup, "SOCKET_TIMEOUT_SECS", tier.default_socket_timeout_secs())?;
        let probe_timeout_secs = parse_or(lookup, "PROBE_TIMEOUT_SECS", socket_timeout_secs + 15)?;
        let extract_timeout_secs = parse_or(lookup, "EXTRACT_TIMEOUT_SECS", tier.default_extract_timeout_secs())?;

        let extractor = ExtractorConfig {
            bin: non_empty(lookup, "YTDL_BIN").unwrap_or_else(|| "yt-dlp".to_string()),
            socket_timeout: Duration::from_secs(socket_timeout_secs),
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            extract_timeout: Duration::from_secs(extract_timeout_secs),
            player_client: match lookup("YTDL_PLAYER_CLIENT") {
                Some(raw) if raw.trim().is_empty() => None,
                Some(raw) => Some(raw.trim().to_string()),
                None => Some("ios,web".to_string()),
            },
        };

        let policy = FormatPolicy {
            downgrade_threshold_secs: parse_switchable(lookup, "DOWNGRADE_THRESHOLD_SECS", Some(900))?,
            high_tier_height: parse_switchable(lookup, "VIDEO_HIGH_HEIGHT", tier.default_high_tier_height())?,
            low_tier_height: parse_or(lookup, "VIDEO_LOW_HEIGHT", 480)?,
            audio_quality: non_empty(lookup, "AUDIO_QUALITY").unwrap_or_else(|| "192K".to_string()),
        };

        let ceiling_mb: f64 = parse_or(lookup, "DELIVERY_CEILING_MB", tier.default_ceiling_mb())?;
        if !ceiling_mb.is_finite() || ceiling_mb <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "DELIVERY_CEILING_MB",
                value: ceiling_mb.to_string(),
            });
        }

        let admission = match non_empty(lookup, "ADMISSION_POLICY") {
            Some(raw) => match raw.to_lowercase().parse() {
                Ok(policy) => policy,
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        key: "ADMISSION_POLICY",
                        value: raw,
                    })
                }
            },
            None => AdmissionPolicy::Reject,
        };

        Ok(Self {
            tier,
            work_dir: non_empty(lookup, "TEMP_FILES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            probe_required: parse_or(lookup, "PROBE_REQUIRED", tier.default_probe_required())?,
            policy,
            extractor,
            ceiling_bytes: mb_to_bytes(ceiling_mb),
            max_concurrent: parse_or(lookup, "MAX_CONCURRENT_RETRIEVALS", 2usize)?.max(1),
            admission,
        })
    }

    /// Ceiling in MB, for messages and logs.
    pub fn ceiling_mb(&self) -> f64 {
        self.ceiling_bytes as f64 / BYTES_PER_MB
    }

    /// Gate with the tier ceiling for every kind.
    pub fn delivery_gate(&self) -> DeliveryGate {
        DeliveryGate::new(self.ceiling_bytes)
    }
}

/// Full bot configuration
#[derive(Debug)]
pub struct Config {
    pub bot_token: SecretString,
    /// Alternate Bot API endpoint, `BOT_API_URL`
    pub api_url: Option<Url>,
    /// How long a posted link waits for a format choice
    pub pending_link_ttl: Duration,
    pub retrieval: RetrievalConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_empty(&lookup, "BOT_TOKEN")
            .or_else(|| non_empty(&lookup, "TELOXIDE_TOKEN"))
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            bot_token: SecretString::from(token),
            api_url: parse_api_url(&lookup)?,
            pending_link_ttl: Duration::from_secs(parse_or(&lookup, "PENDING_LINK_TTL_SECS", 900u64)?),
            retrieval: RetrievalConfig::from_lookup(&lookup)?,
        })
    }

    pub fn tier(&self) -> DeploymentTier {
        self.retrieval.tier
    }
}

/// Log file path, `LOG_FILE_PATH`. Read on its own because the logger is
/// initialised before the rest of the configuration is validated.
pub fn log_file_path() -> PathBuf {
    env::var("LOG_FILE_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("grabbot.log"))
}

pub fn mb_to_bytes(mb: f64) -> u64 {
    (mb * BYTES_PER_MB).round() as u64
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}

/// Optional limit: unset keeps `default`, an [`OFF_VALUES`] entry disables it.
fn parse_switchable<T, F>(lookup: &F, key: &'static str, default: Option<T>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) if OFF_VALUES.contains(&raw.to_lowercase().as_str()) => Ok(None),
        Some(raw) => match raw.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}

fn parse_api_url<F>(lookup: &F) -> Result<Option<Url>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, "BOT_API_URL") {
        Some(raw) => match Url::parse(&raw) {
            Ok(url) => Ok(Some(url)),
            Err(_) => Err(ConfigError::Invalid {
                key: "BOT_API_URL",
                value: raw,
            }),
        },
        None => Ok(None),
    }
}
