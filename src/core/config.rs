use crate::core::error::ConfigError;
use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

pub const BYTES_GB: u64 = 1024 * 1024 * 1024;

/// Upper bound for every day/hour window so date arithmetic cannot overflow
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub client: ClientConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_request_delay_secs")]
    pub request_delay_secs: u64,
    /// Offset of the timezone the tracker reports `discountEndTime` in.
    /// Machine local time when unset.
    #[serde(default)]
    pub utc_offset_hours: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_add_free_days")]
    pub add_free_days: i64,
    #[serde(default = "default_remove_free_hours")]
    pub remove_free_hours: i64,
    #[serde(default = "default_file_size_limit_gb")]
    pub file_size_limit_gb: u64,
    #[serde(default = "default_clear_days")]
    pub clear_days: i64,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_listing_tag_prefix")]
    pub listing_tag_prefix: String,
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
    #[serde(default)]
    pub start_paused: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_request_delay_secs() -> u64 {
    5
}

fn default_add_free_days() -> i64 {
    5
}

fn default_remove_free_hours() -> i64 {
    12
}

fn default_file_size_limit_gb() -> u64 {
    15
}

fn default_clear_days() -> i64 {
    7
}

fn default_tag() -> String {
    "mt_free_auto".to_string()
}

fn default_listing_tag_prefix() -> String {
    "mt_".to_string()
}

fn default_modes() -> Vec<String> {
    vec!["adult".to_string(), "normal".to_string()]
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            add_free_days: default_add_free_days(),
            remove_free_hours: default_remove_free_hours(),
            file_size_limit_gb: default_file_size_limit_gb(),
            clear_days: default_clear_days(),
            tag: default_tag(),
            listing_tag_prefix: default_listing_tag_prefix(),
            modes: default_modes(),
            start_paused: false,
            dry_run: false,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api_base(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SweepConfig {
    /// How far out a free period must still extend for a listing to be added
    pub fn add_window(&self) -> Duration {
        Duration::days(self.add_free_days)
    }

    /// How close to the end of a free period an added listing is retracted
    pub fn remove_window(&self) -> Duration {
        Duration::hours(self.remove_free_hours)
    }

    pub fn clear_after(&self) -> Duration {
        Duration::days(self.clear_days)
    }

    pub fn size_limit_bytes(&self) -> u64 {
        self.file_size_limit_gb.saturating_mul(BYTES_GB)
    }
}

impl NotifyConfig {
    /// Bot token and chat id, or `None` when delivery is disabled
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat_id = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat_id))
    }
}

impl TrackerConfig {
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_hours
            .and_then(|hours| hours.checked_mul(3600))
            .and_then(FixedOffset::east_opt)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup using the environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let tracker = TrackerConfig {
            base_url: required("MT_BASE_URL")?,
            api_key: required("MT_API_KEY")?,
            request_delay_secs: parse_or(&get, "MT_AUTO_REQUEST_DELAY_SECS", default_request_delay_secs())?,
            utc_offset_hours: parse_opt(&get, "MT_AUTO_TRACKER_UTC_OFFSET_HOURS")?,
        };

        let client = ClientConfig {
            url: required("QB_URL")?,
            port: parse_required(&get, "QB_PORT")?,
            username: required("QB_USER")?,
            password: required("QB_PASSWORD")?,
        };

        let sweep = SweepConfig {
            add_free_days: parse_or(&get, "MT_AUTO_ADD_FREE_DAYS", default_add_free_days())?,
            remove_free_hours: parse_or(&get, "MT_AUTO_REMOVE_FREE_HOURS", default_remove_free_hours())?,
            file_size_limit_gb: parse_or(&get, "MT_AUTO_FILE_SIZE_LIMIT_GB", default_file_size_limit_gb())?,
            clear_days: parse_or(&get, "MT_AUTO_CLEAR_DAYS", default_clear_days())?,
            tag: get("MT_AUTO_TAG").unwrap_or_else(default_tag),
            listing_tag_prefix: get("MT_AUTO_LISTING_TAG_PREFIX").unwrap_or_else(default_listing_tag_prefix),
            modes: get("MT_AUTO_MODES")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(default_modes),
            start_paused: parse_bool_or(&get, "MT_AUTO_START_PAUSED", false)?,
            dry_run: parse_bool_or(&get, "MT_AUTO_DRY_RUN", false)?,
        };

        let notify = NotifyConfig {
            bot_token: get("MT_AUTO_TG_BOT_TOKEN"),
            chat_id: get("MT_AUTO_TG_CHAT_ID"),
            api_base: get("MT_AUTO_TG_API_BASE").unwrap_or_else(default_telegram_api_base),
        };

        let logging = LoggingConfig {
            level: get("MT_AUTO_LOG_LEVEL").unwrap_or_else(default_log_level),
            format: get("MT_AUTO_LOG_FORMAT").unwrap_or_else(default_log_format),
        };

        let config = Config {
            tracker,
            client,
            sweep,
            notify,
            logging,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate tracker config
        if self.tracker.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("tracker base_url must not be empty".into()));
        }

        if self.tracker.api_key.trim().is_empty() {
            return Err(ConfigError::Validation("tracker api_key must not be empty".into()));
        }

        if self.tracker.utc_offset_hours.is_some() && self.tracker.utc_offset().is_none() {
            return Err(ConfigError::Validation(format!(
                "utc_offset_hours {} is out of range",
                self.tracker.utc_offset_hours.unwrap_or_default()
            )));
        }

        // Validate client config
        if self.client.url.trim().is_empty() {
            return Err(ConfigError::Validation("client url must not be empty".into()));
        }

        if self.client.port == 0 {
            return Err(ConfigError::Validation("client port must be greater than 0".into()));
        }

        if self.client.username.is_empty() {
            return Err(ConfigError::Validation("client username must not be empty".into()));
        }

        // Validate sweep config
        if self.sweep.add_free_days < 0 || self.sweep.remove_free_hours < 0 {
            return Err(ConfigError::Validation("free windows must be non-negative".into()));
        }

        // Bounds first: the window accessors below must not overflow
        if self.sweep.add_free_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Validation(format!(
                "add_free_days must not exceed {MAX_WINDOW_DAYS}"
            )));
        }

        if self.sweep.remove_free_hours > MAX_WINDOW_DAYS * 24 {
            return Err(ConfigError::Validation(format!(
                "remove_free_hours must not exceed {}",
                MAX_WINDOW_DAYS * 24
            )));
        }

        if self.sweep.clear_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Validation(format!(
                "clear_days must not exceed {MAX_WINDOW_DAYS}"
            )));
        }

        if self.sweep.remove_window() > self.sweep.add_window() {
            return Err(ConfigError::Validation(format!(
                "remove window ({}h) must not exceed add window ({}d)",
                self.sweep.remove_free_hours, self.sweep.add_free_days
            )));
        }

        if self.sweep.file_size_limit_gb == 0 {
            return Err(ConfigError::Validation("file_size_limit_gb must be greater than 0".into()));
        }

        if self.sweep.clear_days <= 0 {
            return Err(ConfigError::Validation("clear_days must be greater than 0".into()));
        }

        if self.sweep.tag.trim().is_empty() {
            return Err(ConfigError::Validation("tag must not be empty".into()));
        }

        if self.sweep.tag.contains(',') || self.sweep.listing_tag_prefix.contains(',') {
            return Err(ConfigError::Validation("tags must not contain ','".into()));
        }

        if self.sweep.modes.is_empty() {
            return Err(ConfigError::Validation("at least one search mode is required".into()));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn parse_required<T, G>(get: &G, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    parse_opt(get, key)?.ok_or(ConfigError::Missing(key))
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}

fn parse_bool_or<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("MT_BASE_URL", "https://api.m-team.cc/"),
            ("MT_API_KEY", "secret"),
            ("QB_URL", "http://127.0.0.1"),
            ("QB_PORT", "8080"),
            ("QB_USER", "admin"),
            ("QB_PASSWORD", "adminadmin"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_env_defaults() {
        let config = load(&base_env()).expect("Failed to load config");

        assert_eq!(config.sweep.add_free_days, 5);
        assert_eq!(config.sweep.remove_free_hours, 12);
        assert_eq!(config.sweep.file_size_limit_gb, 15);
        assert_eq!(config.sweep.clear_days, 7);
        assert_eq!(config.sweep.tag, "mt_free_auto");
        assert_eq!(config.sweep.modes, vec!["adult", "normal"]);
        assert!(!config.sweep.start_paused);
        assert_eq!(config.tracker.request_delay_secs, 5);
        assert!(config.notify.credentials().is_none());
        assert_eq!(config.client.port, 8080);
    }

    #[test]
    fn test_env_missing_required() {
        let mut env = base_env();
        env.remove("MT_API_KEY");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MT_API_KEY")));
    }

    #[test]
    fn test_env_empty_required_counts_as_missing() {
        let mut env = base_env();
        env.insert("QB_USER", "  ");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("QB_USER")));
    }

    #[test]
    fn test_env_invalid_number() {
        let mut env = base_env();
        env.insert("MT_AUTO_CLEAR_DAYS", "seven");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MT_AUTO_CLEAR_DAYS", .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut env = base_env();
        env.insert("MT_AUTO_ADD_FREE_DAYS", "3");
        env.insert("MT_AUTO_REMOVE_FREE_HOURS", "6");
        env.insert("MT_AUTO_FILE_SIZE_LIMIT_GB", "40");
        env.insert("MT_AUTO_MODES", "normal, movie ,");
        env.insert("MT_AUTO_START_PAUSED", "yes");
        env.insert("MT_AUTO_TG_BOT_TOKEN", "123:abc");
        env.insert("MT_AUTO_TG_CHAT_ID", "-1001");

        let config = load(&env).expect("Failed to load config");
        assert_eq!(config.sweep.add_window(), Duration::days(3));
        assert_eq!(config.sweep.remove_window(), Duration::hours(6));
        assert_eq!(config.sweep.size_limit_bytes(), 40 * BYTES_GB);
        assert_eq!(config.sweep.modes, vec!["normal", "movie"]);
        assert!(config.sweep.start_paused);
        assert_eq!(config.notify.credentials(), Some(("123:abc", "-1001")));
    }

    #[test]
    fn test_notify_requires_both_credentials() {
        let mut env = base_env();
        env.insert("MT_AUTO_TG_BOT_TOKEN", "123:abc");

        let config = load(&env).expect("Failed to load config");
        assert!(config.notify.credentials().is_none());
    }

    #[test]
    fn test_remove_window_must_not_exceed_add_window() {
        let mut env = base_env();
        env.insert("MT_AUTO_ADD_FREE_DAYS", "1");
        env.insert("MT_AUTO_REMOVE_FREE_HOURS", "48");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_huge_windows_are_config_errors() {
        for (key, value) in [
            ("MT_AUTO_ADD_FREE_DAYS", "200000000000000"),
            ("MT_AUTO_CLEAR_DAYS", "100000000000"),
            ("MT_AUTO_REMOVE_FREE_HOURS", "9223372036854775807"),
            ("MT_AUTO_ADD_FREE_DAYS", "3651"),
        ] {
            let mut env = base_env();
            env.insert(key, value);

            let err = load(&env).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{key}={value}");
        }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let mut env = base_env();
        env.insert("MT_AUTO_ADD_FREE_DAYS", "3650");
        env.insert("MT_AUTO_CLEAR_DAYS", "3650");

        let config = load(&env).expect("Failed to load config");
        let now = chrono::Utc::now();
        assert!(now - config.sweep.clear_after() < now + config.sweep.add_window());
    }

    #[test]
    fn test_huge_window_in_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(
            file,
            r#"
[tracker]
base_url = "https://api.m-team.cc"
api_key = "secret"

[client]
url = "qb.local"
port = 8080
username = "admin"
password = "adminadmin"

[sweep]
clear_days = 100000000000
"#
        )
        .expect("Failed to write config");

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_log_format() {
        let mut env = base_env();
        env.insert("MT_AUTO_LOG_FORMAT", "xml");

        assert!(load(&env).is_err());
    }

    #[test]
    fn test_utc_offset() {
        let mut env = base_env();
        env.insert("MT_AUTO_TRACKER_UTC_OFFSET_HOURS", "8");

        let config = load(&env).expect("Failed to load config");
        assert_eq!(config.tracker.utc_offset(), FixedOffset::east_opt(8 * 3600));

        env.insert("MT_AUTO_TRACKER_UTC_OFFSET_HOURS", "30");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(
            file,
            r#"
[tracker]
base_url = "https://api.m-team.cc"
api_key = "secret"
request_delay_secs = 0

[client]
url = "qb.local"
port = 8080
username = "admin"
password = "adminadmin"

[sweep]
file_size_limit_gb = 30
modes = ["normal"]

[notify]
bot_token = "123:abc"
chat_id = "42"

[logging]
format = "json"
"#
        )
        .expect("Failed to write config");

        let config = Config::from_file(file.path()).expect("Failed to load config");
        assert_eq!(config.tracker.request_delay_secs, 0);
        assert_eq!(config.sweep.file_size_limit_gb, 30);
        assert_eq!(config.sweep.clear_days, 7);
        assert_eq!(config.sweep.modes, vec!["normal"]);
        assert_eq!(config.notify.api_base, "https://api.telegram.org");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_file(Path::new("does-not-exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
