// src/config.rs
// All runtime configuration comes from the environment, read once at
// startup into an explicit value (no ambient globals).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

const DEFAULT_SOURCE_URL: &str = "https://medicina.unicz.it/avvisi";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram bot API token.
    pub token: String,
    /// Operator/admin chat. Always receives status and new-subscriber
    /// announcements, and seeds the subscriber list on first run.
    pub primary_chat: i64,
    /// Page to poll for notices.
    pub source_url: String,
    /// Scheme + host of `source_url`, used to absolutize relative hrefs.
    pub origin: String,
    /// Period of the scheduled check.
    pub check_interval: Duration,
    /// Quiet time after the last delivered event before a "still alive"
    /// heartbeat goes out.
    pub heartbeat_after: chrono::Duration,
    /// Timeout applied to the page fetch and to each outbound send.
    pub http_timeout: Duration,
    pub seen_path: std::path::PathBuf,
    pub subscribers_path: std::path::PathBuf,
    /// Verbose mode: every run produces exactly one outcome message,
    /// either the new notices or a flat "nothing new".
    pub notify_every_run: bool,
}

impl AppConfig {
    /// The only fatal errors in the system: a missing TOKEN or CHAT_ID.
    /// Everything else falls back to a default.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TOKEN").map_err(|_| anyhow!("TOKEN not set"))?;
        let primary_chat: i64 = std::env::var("CHAT_ID")
            .map_err(|_| anyhow!("CHAT_ID not set"))?
            .trim()
            .parse()
            .context("CHAT_ID is not a valid chat id")?;

        let source_url =
            std::env::var("SOURCE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string());
        let origin = origin_of(&source_url)
            .ok_or_else(|| anyhow!("SOURCE_URL has no scheme://host prefix: {source_url}"))?;

        Ok(Self {
            token,
            primary_chat,
            origin,
            source_url,
            check_interval: Duration::from_secs(env_u64("CHECK_INTERVAL_SECS", 300)),
            heartbeat_after: chrono::Duration::seconds(
                env_u64("HEARTBEAT_SECS", 3600) as i64
            ),
            http_timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 15)),
            seen_path: std::env::var("SEEN_STATE_PATH")
                .unwrap_or_else(|_| "state/seen.json".to_string())
                .into(),
            subscribers_path: std::env::var("SUBSCRIBERS_PATH")
                .unwrap_or_else(|_| "state/subscribers.json".to_string())
                .into(),
            notify_every_run: std::env::var("NOTIFY_EVERY_RUN")
                .ok()
                .is_some_and(|v| v == "1"),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `scheme://host` portion of a URL, without trailing slash.
pub fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    if rest.is_empty() {
        return None;
    }
    let host_end = rest.find('/').unwrap_or(rest.len());
    Some(url[..scheme_end + 3 + host_end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path() {
        assert_eq!(
            origin_of("https://medicina.unicz.it/avvisi").as_deref(),
            Some("https://medicina.unicz.it")
        );
    }

    #[test]
    fn origin_without_path_is_whole_url() {
        assert_eq!(
            origin_of("https://medicina.unicz.it").as_deref(),
            Some("https://medicina.unicz.it")
        );
    }

    #[test]
    fn origin_rejects_schemeless() {
        assert_eq!(origin_of("medicina.unicz.it/avvisi"), None);
        assert_eq!(origin_of("https://"), None);
    }
}
