//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;
use messenger::DEFAULT_GRAPH_URL;
use orchestrator::DEFAULT_QUEUE_SIZE;
use report_flow::{FlowSettings, DEFAULT_PAGE_LIMIT};

/// Bot server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Page access token for the Send API.
    pub page_access_token: String,
    /// Token expected in the webhook subscription handshake.
    pub verify_token: String,
    /// Graph API base URL.
    pub graph_api_url: String,
    /// Directory stored attachments are written under.
    pub media_dir: PathBuf,
    /// Public URL the media directory is served at.
    pub media_base_url: String,
    /// Zone report timestamps are shown in.
    pub local_offset: FixedOffset,
    /// Reports per history page.
    pub page_size: usize,
    /// Capacity of the turn queue.
    pub queue_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BOT_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:pongibot.db?mode=rwc` |
    /// | `PAGE_ACCESS_TOKEN` | Send API token | (required) |
    /// | `VERIFY_TOKEN` | Webhook handshake token | (required) |
    /// | `GRAPH_API_URL` | Graph API base | `https://graph.facebook.com/v2.8` |
    /// | `MEDIA_DIR` | Stored attachment root | `media` |
    /// | `MEDIA_BASE_URL` | Public URL of `MEDIA_DIR` | `http://127.0.0.1:8790/media` |
    /// | `LOCAL_UTC_OFFSET` | Zone for report times | `+08:00` |
    /// | `REPORT_PAGE_SIZE` | Reports per page (1-10) | `5` |
    /// | `DISPATCH_QUEUE_SIZE` | Turn queue capacity | `256` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let addr = var("BOT_ADDR", "127.0.0.1:8790")
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let page_access_token = lookup("PAGE_ACCESS_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("PAGE_ACCESS_TOKEN"))?;

        let verify_token = lookup("VERIFY_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("VERIFY_TOKEN"))?;

        let offset = var("LOCAL_UTC_OFFSET", "+08:00");
        let local_offset =
            parse_offset(&offset).ok_or(ConfigError::InvalidOffset(offset))?;

        Ok(Self {
            addr,
            database_url: var("SQLITE_PATH", "sqlite:pongibot.db?mode=rwc"),
            page_access_token,
            verify_token,
            graph_api_url: var("GRAPH_API_URL", DEFAULT_GRAPH_URL),
            media_dir: PathBuf::from(var("MEDIA_DIR", "media")),
            media_base_url: var("MEDIA_BASE_URL", "http://127.0.0.1:8790/media"),
            local_offset,
            page_size: parse_number(&lookup, "REPORT_PAGE_SIZE", DEFAULT_PAGE_LIMIT)?,
            queue_size: parse_number(&lookup, "DISPATCH_QUEUE_SIZE", DEFAULT_QUEUE_SIZE)?,
        })
    }

    /// Rendering settings for the conversation.
    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings::default()
            .with_page_limit(self.page_size)
            .with_local_offset(self.local_offset)
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var: key, value }),
    }
}

/// Parse a `+HH:MM` / `-HH:MM` UTC offset.
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid BOT_ADDR format")]
    InvalidAddr,

    #[error("{0} environment variable is required")]
    MissingVar(&'static str),

    #[error("Invalid LOCAL_UTC_OFFSET: {0} (expected +HH:MM)")]
    InvalidOffset(String),

    #[error("Invalid {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] =
        [("PAGE_ACCESS_TOKEN", "token"), ("VERIFY_TOKEN", "verify")];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8790");
        assert_eq!(config.database_url, "sqlite:pongibot.db?mode=rwc");
        assert_eq!(config.graph_api_url, "https://graph.facebook.com/v2.8");
        assert_eq!(config.media_dir, PathBuf::from("media"));
        assert_eq!(config.local_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.queue_size, 256);
    }

    #[test]
    fn test_required_tokens() {
        let result = Config::from_lookup(lookup(&[("VERIFY_TOKEN", "verify")]));
        assert!(matches!(result, Err(ConfigError::MissingVar("PAGE_ACCESS_TOKEN"))));

        let result = Config::from_lookup(lookup(&[
            ("PAGE_ACCESS_TOKEN", "token"),
            ("VERIFY_TOKEN", ""),
        ]));
        assert!(matches!(result, Err(ConfigError::MissingVar("VERIFY_TOKEN"))));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("BOT_ADDR", "0.0.0.0:9000"),
            ("LOCAL_UTC_OFFSET", "-05:30"),
            ("REPORT_PAGE_SIZE", "50"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.local_offset.local_minus_utc(), -(5 * 3600 + 30 * 60));

        // The page size is clamped when building the flow settings
        assert_eq!(config.flow_settings().page_limit, 10);
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("REPORT_PAGE_SIZE", "five"));
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::InvalidNumber { var: "REPORT_PAGE_SIZE", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("BOT_ADDR", "nowhere"));
        assert!(matches!(Config::from_lookup(lookup(&vars)), Err(ConfigError::InvalidAddr)));
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+09:00").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(parse_offset("+00:00").unwrap().local_minus_utc(), 0);
        assert!(parse_offset("09:00").is_none());
        assert!(parse_offset("+24:00").is_none());
        assert!(parse_offset("+8").is_none());
    }
}
