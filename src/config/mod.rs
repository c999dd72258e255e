//! Configuration management for feedrelay.
//!
//! Configuration is read from `~/.config/feedrelay/config.toml` unless a path
//! is given on the command line. If the default file doesn't exist, a
//! commented default configuration is created.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::daemon::DaemonConfig;
use crate::fetcher::http_fetcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::sources::feed::DEFAULT_FEED_LIMIT;
use crate::sources::listing::DEFAULT_LISTING_LIMIT;
use crate::sources::scrape::DEFAULT_SCRAPE_LIMIT;
use crate::sources::{FeedConfig, ListingConfig, ScrapeConfig, SourceConfig};

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    /// Per-request network timeout.
    pub timeout_secs: u64,
    /// Pause between the end of one run and the start of the next ("20m", "1h", ...).
    pub interval: String,
    pub run_on_start: bool,
    pub publish_delay_ms: u64,
    pub ledger_path: Option<PathBuf>,
    /// Forget ledger entries older than this many days. Unset keeps them forever.
    pub retention_days: Option<u64>,
    pub destinations: Vec<DestinationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DestinationConfig {
    pub name: String,
    #[serde(default)]
    pub footer: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Environment variable holding the webhook URL.
    #[serde(default)]
    pub webhook_url_env: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl DestinationConfig {
    /// The webhook URL, from the file first and the environment second.
    pub fn webhook(&self) -> Option<String> {
        self.webhook_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                self.webhook_url_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|u| !u.trim().is_empty())
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            interval: "20m".to_string(),
            run_on_start: true,
            publish_delay_ms: 700,
            ledger_path: None,
            retention_days: None,
            destinations: default_destinations(),
        }
    }
}

fn default_destinations() -> Vec<DestinationConfig> {
    vec![
        DestinationConfig {
            name: "news".to_string(),
            footer: "AIFinity Hub • AI News".to_string(),
            webhook_url: None,
            webhook_url_env: Some("NEWS_WEBHOOK_URL".to_string()),
            sources: vec![
                SourceConfig::Feed(FeedConfig {
                    tag: "HF".to_string(),
                    url: "https://huggingface.co/blog/feed.xml".to_string(),
                    title_prefix: String::new(),
                    fallback_title: "HF News".to_string(),
                    limit: DEFAULT_FEED_LIMIT,
                }),
                SourceConfig::Listing(ListingConfig {
                    tag: "CIVITAI".to_string(),
                    url: "https://civitai.com/api/v1/models?limit=5&sort=Newest".to_string(),
                    link_template: "https://civitai.com/models/{id}".to_string(),
                    title_prefix: "🚀 New Model: ".to_string(),
                    fallback_title: "CivitAI Model".to_string(),
                    limit: DEFAULT_LISTING_LIMIT,
                    items_field: "items".to_string(),
                    id_field: "id".to_string(),
                    title_field: "name".to_string(),
                    description_field: "description".to_string(),
                }),
            ],
        },
        DestinationConfig {
            name: "game".to_string(),
            footer: "AIFinity Hub • FUT News".to_string(),
            webhook_url: None,
            webhook_url_env: Some("GAME_WEBHOOK_URL".to_string()),
            sources: vec![
                SourceConfig::Feed(FeedConfig {
                    tag: "EA".to_string(),
                    url: "https://news.ea.com/rss/pressrelease.aspx".to_string(),
                    title_prefix: "EA Update: ".to_string(),
                    fallback_title: "EA News".to_string(),
                    limit: DEFAULT_FEED_LIMIT,
                }),
                SourceConfig::Scrape(ScrapeConfig {
                    tag: "FUTGG".to_string(),
                    url: "https://www.fut.gg/news/".to_string(),
                    href_prefix: "/news/".to_string(),
                    title_prefix: "FUT.GG: ".to_string(),
                    fallback_title: "FUT.GG News".to_string(),
                    limit: DEFAULT_SCRAPE_LIMIT,
                }),
            ],
        },
    ]
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// An explicit path must exist. A missing default config is created with
    /// comments and the defaults are returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                    tracing::info!(path = %p.display(), "wrote default config");
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/feedrelay/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedrelay").join("config.toml"))
    }

    /// Where the ledger snapshot lives: `ledger_path`, or
    /// `<data_dir>/feedrelay/ledger.json`.
    pub fn ledger_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.ledger_path {
            Some(p) => Ok(p.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("feedrelay").join("ledger.json"))
            }
        }
    }

    pub fn interval_secs(&self) -> Result<u64, ConfigError> {
        let secs = DaemonConfig::parse_interval(&self.interval).map_err(ConfigError::Invalid)?;
        if secs == 0 {
            return Err(ConfigError::Invalid("interval must be greater than zero".into()));
        }
        Ok(secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interval_secs()?;

        let mut names = HashSet::new();
        for destination in &self.destinations {
            if destination.name.trim().is_empty() {
                return Err(ConfigError::Invalid("destination without a name".into()));
            }
            if !names.insert(destination.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate destination '{}'",
                    destination.name
                )));
            }
            for source in &destination.sources {
                Url::parse(source.url()).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "source {} in '{}' has invalid url '{}': {}",
                        source.tag(),
                        destination.name,
                        source.url(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, Self::default_config_content()).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        format!(
            r##"# feedrelay configuration
#
# Every run polls the sources of each destination, skips items already in
# the ledger and posts the rest to the destination's Discord webhook.
#
# A destination's webhook URL comes from `webhook_url`, or from the
# environment variable named by `webhook_url_env`. Destinations without a
# webhook are skipped.
#
# Source kinds:
# - feed:    RSS/Atom/JSON Feed document
# - listing: JSON API returning an array of records
# - scrape:  HTML page; anchors whose href starts with `href_prefix`

user_agent = "{user_agent}"
timeout_secs = {timeout}

# Pause after each run ("30s", "20m", "1h", "1d")
interval = "20m"
run_on_start = true

# Delay between two posts, in milliseconds
publish_delay_ms = 700

# ledger_path = "/var/lib/feedrelay/ledger.json"
# retention_days = 180

[[destinations]]
name = "news"
footer = "AIFinity Hub • AI News"
webhook_url_env = "NEWS_WEBHOOK_URL"

[[destinations.sources]]
kind = "feed"
tag = "HF"
url = "https://huggingface.co/blog/feed.xml"
fallback_title = "HF News"

[[destinations.sources]]
kind = "listing"
tag = "CIVITAI"
url = "https://civitai.com/api/v1/models?limit=5&sort=Newest"
link_template = "https://civitai.com/models/{{id}}"
title_prefix = "🚀 New Model: "
fallback_title = "CivitAI Model"

[[destinations]]
name = "game"
footer = "AIFinity Hub • FUT News"
webhook_url_env = "GAME_WEBHOOK_URL"

[[destinations.sources]]
kind = "feed"
tag = "EA"
url = "https://news.ea.com/rss/pressrelease.aspx"
title_prefix = "EA Update: "
fallback_title = "EA News"

[[destinations.sources]]
kind = "scrape"
tag = "FUTGG"
url = "https://www.fut.gg/news/"
href_prefix = "/news/"
title_prefix = "FUT.GG: "
fallback_title = "FUT.GG News"
"##,
            user_agent = DEFAULT_USER_AGENT,
            timeout = DEFAULT_TIMEOUT_SECS,
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert_eq!(config.interval_secs().unwrap(), 20 * 60);
        assert_eq!(config.timeout_secs, 25);
        assert_eq!(config.destinations.len(), 2);
    }

    #[test]
    fn test_partial_config() {
        let content = r#"
interval = "5m"

[[destinations]]
name = "alerts"
webhook_url = "https://discord.com/api/webhooks/1/abc"

[[destinations.sources]]
kind = "feed"
tag = "RUST"
url = "https://blog.rust-lang.org/feed.xml"
"#;
        let config: Config = toml::from_str(content).unwrap();

        assert_eq!(config.interval_secs().unwrap(), 300);
        assert_eq!(config.publish_delay_ms, 700);
        assert_eq!(config.destinations.len(), 1);
        let alerts = &config.destinations[0];
        assert_eq!(alerts.footer, "");
        assert_eq!(alerts.webhook().as_deref(), Some("https://discord.com/api/webhooks/1/abc"));
        match &alerts.sources[0] {
            SourceConfig::Feed(feed) => assert_eq!(feed.limit, DEFAULT_FEED_LIMIT),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_webhook_from_environment() {
        let destination = DestinationConfig {
            name: "news".into(),
            footer: String::new(),
            webhook_url: None,
            webhook_url_env: Some("FEEDRELAY_TEST_WEBHOOK_FROM_ENV".into()),
            sources: vec![],
        };
        assert_eq!(destination.webhook(), None);

        std::env::set_var(
            "FEEDRELAY_TEST_WEBHOOK_FROM_ENV",
            "https://discord.com/api/webhooks/2/x",
        );
        assert_eq!(
            destination.webhook().as_deref(),
            Some("https://discord.com/api/webhooks/2/x")
        );
        std::env::remove_var("FEEDRELAY_TEST_WEBHOOK_FROM_ENV");
    }

    #[test]
    fn test_blank_webhook_is_unresolved() {
        let destination = DestinationConfig {
            name: "news".into(),
            footer: String::new(),
            webhook_url: Some("  ".into()),
            webhook_url_env: None,
            sources: vec![],
        };
        assert_eq!(destination.webhook(), None);
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let content = r#"
[[destinations]]
name = "news"
[[destinations]]
name = "news"
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_interval_and_url_rejected() {
        let config = Config {
            interval: "soon".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let content = r#"
[[destinations]]
name = "news"
[[destinations.sources]]
kind = "feed"
tag = "X"
url = "/relative/feed.xml"
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval = \"1h\"\nledger_path = \"state.json\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.interval_secs().unwrap(), 3600);
        assert_eq!(config.ledger_path().unwrap(), PathBuf::from("state.json"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval = ").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }
}
