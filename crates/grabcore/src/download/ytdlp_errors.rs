//! Analysis of yt-dlp failures
//!
//! Sorts extractor stderr into a handful of categories so the log says why a
//! download failed. The user only ever sees the generic "download failed"
//! message; these categories are for whoever operates the bot.

/// Types of yt-dlp errors
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum YtDlpErrorType {
    /// Private, removed or nonexistent media
    VideoUnavailable,
    /// Geo-blocked, age-gated or members-only
    Restricted,
    /// The site flagged the request as automated
    BotDetection,
    /// Timeouts, DNS, refused connections
    NetworkError,
    /// No extractor for this URL, or nothing downloadable on the page
    Unsupported,
    /// Anything else
    Unknown,
}

/// Analyzes yt-dlp stderr and determines the error type
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("not available in your country")
        || stderr_lower.contains("geo restricted")
        || stderr_lower.contains("geo-restricted")
        || stderr_lower.contains("confirm your age")
        || stderr_lower.contains("age-restricted")
        || stderr_lower.contains("inappropriate for some users")
        || stderr_lower.contains("members-only")
        || stderr_lower.contains("join this channel")
    {
        return YtDlpErrorType::Restricted;
    }

    if stderr_lower.contains("sign in to confirm you're not a bot")
        || stderr_lower.contains("http error 429")
        || stderr_lower.contains("http error 403")
        || stderr_lower.contains("signature extraction failed")
    {
        return YtDlpErrorType::BotDetection;
    }

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("does not exist")
        || stderr_lower.contains("http error 404")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if stderr_lower.contains("unsupported url")
        || stderr_lower.contains("no video formats found")
        || stderr_lower.contains("requested format is not available")
    {
        return YtDlpErrorType::Unsupported;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network is unreachable")
        || stderr_lower.contains("name or service not known")
        || stderr_lower.contains("temporary failure in name resolution")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Whether the failure points at the deployment rather than the link
/// (worth an operator's attention).
pub fn is_operational(error_type: &YtDlpErrorType) -> bool {
    matches!(
        error_type,
        YtDlpErrorType::BotDetection | YtDlpErrorType::NetworkError | YtDlpErrorType::Unknown
    )
}

/// Keeps only the `ERROR:` lines of stderr, falling back to its tail.
pub fn summarize_stderr(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return errors.join("\n");
    }

    let tail: Vec<&str> = stderr.lines().rev().filter(|l| !l.trim().is_empty()).take(3).collect();
    tail.into_iter().rev().collect::<Vec<_>>().join("\n")
}
