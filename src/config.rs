use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::model::ReferenceList;
use crate::sentinel::alert::{XCredentials, X_API_URL};
use crate::sentinel::matcher::{SimilarityMatcher, DEFAULT_THRESHOLD};
use crate::sentinel::registry::{DEFAULT_PAGE_SIZE, NPM_REGISTRY_URL};
use crate::traits::ReferenceError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    References(#[from] ReferenceError),
}

/// Runtime configuration.
///
/// Loaded from an optional `sentinel.{toml,yaml,json}` file, then overridden
/// by `SENTINEL_*` environment variables (a `.env` file is honoured). The
/// `TWITTER_API_KEY`, `TWITTER_API_SECRET`, `TWITTER_ACCESS_TOKEN` and
/// `TWITTER_ACCESS_TOKEN_SECRET` variables fill any X credential left unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentinelConfig {
    /// Base URL of the npm registry
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Search results requested per poll
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Seconds between polls in continuous mode
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum edit distance reported as a typosquat
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub sink_timeout_secs: u64,

    /// Base URL of the X API
    #[serde(default = "default_x_api_url")]
    pub x_api_url: String,

    /// OAuth 1.0a consumer key
    #[serde(default)]
    pub x_api_key: Option<String>,

    #[serde(default)]
    pub x_api_secret: Option<String>,

    /// OAuth 1.0a access token
    #[serde(default)]
    pub x_access_token: Option<String>,

    #[serde(default)]
    pub x_access_token_secret: Option<String>,

    /// OAuth 2.0 user access token, used when the OAuth 1.0a set is incomplete
    #[serde(default)]
    pub x_bearer_token: Option<String>,

    /// Comma-separated replacement for the built-in reference list
    #[serde(default)]
    pub references: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            page_size: default_page_size(),
            poll_interval_secs: default_poll_interval_secs(),
            threshold: default_threshold(),
            fetch_timeout_secs: default_timeout_secs(),
            sink_timeout_secs: default_timeout_secs(),
            x_api_url: default_x_api_url(),
            x_api_key: None,
            x_api_secret: None,
            x_access_token: None,
            x_access_token_secret: None,
            x_bearer_token: None,
            references: None,
            log_level: default_log_level(),
        }
    }
}

impl SentinelConfig {
    /// Load configuration from `.env`, an optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();

        let mut loaded: SentinelConfig = config::Config::builder()
            .add_source(config::File::with_name("sentinel").required(false))
            .add_source(
                config::Environment::with_prefix("SENTINEL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        let twitter: TwitterEnv = config::Config::builder()
            .add_source(config::Environment::with_prefix("TWITTER").prefix_separator("_"))
            .build()?
            .try_deserialize()?;
        loaded.x_api_key = loaded.x_api_key.or(twitter.api_key);
        loaded.x_api_secret = loaded.x_api_secret.or(twitter.api_secret);
        loaded.x_access_token = loaded.x_access_token.or(twitter.access_token);
        loaded.x_access_token_secret = loaded
            .x_access_token_secret
            .or(twitter.access_token_secret);

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be positive".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be positive".into(),
            ));
        }
        if self.threshold == 0 {
            return Err(ConfigError::Invalid("threshold must be positive".into()));
        }
        Ok(())
    }

    /// The configured reference list, or the built-in npm list.
    pub fn reference_list(&self) -> Result<ReferenceList, ConfigError> {
        match self.references.as_deref() {
            Some(csv) => Ok(ReferenceList::from_csv(csv)?),
            None => Ok(ReferenceList::popular_npm()),
        }
    }

    pub fn matcher(&self) -> Result<SimilarityMatcher, ConfigError> {
        Ok(SimilarityMatcher::new(self.reference_list()?, self.threshold)?)
    }

    /// OAuth 1.0a when all four values are set, else the bearer token, else `None`.
    pub fn x_credentials(&self) -> Option<XCredentials> {
        XCredentials::from_parts(
            self.x_api_key.clone(),
            self.x_api_secret.clone(),
            self.x_access_token.clone(),
            self.x_access_token_secret.clone(),
            self.x_bearer_token.clone(),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }
}

/// `TWITTER_*` credential variables.
#[derive(Debug, Default, Deserialize)]
struct TwitterEnv {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_secret: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    access_token_secret: Option<String>,
}

fn default_registry_url() -> String {
    NPM_REGISTRY_URL.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_x_api_url() -> String {
    X_API_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SentinelConfig::default();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
        assert_eq!(cfg.threshold, 1);
        assert_eq!(cfg.sink_timeout(), Duration::from_secs(10));
        assert!(cfg.x_bearer_token.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg: SentinelConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "poll_interval_secs = 60\nreferences = \"react, express\"",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.registry_url, NPM_REGISTRY_URL);
        assert_eq!(cfg.reference_list().unwrap().as_slice(), ["react", "express"]);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let cfg = SentinelConfig {
            threshold: 0,
            ..SentinelConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let cfg = SentinelConfig {
            page_size: 0,
            ..SentinelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    // The only test that touches the process environment.
    #[test]
    fn test_load_reads_environment() {
        let vars = [
            ("SENTINEL_POLL_INTERVAL_SECS", "77"),
            ("SENTINEL_X_BEARER_TOKEN", "tok-single"),
            ("SENTINEL_X_API_KEY", "sentinel-key"),
            ("TWITTER_API_KEY", "twitter-key"),
            ("TWITTER_API_SECRET", "twitter-secret"),
            ("TWITTER_ACCESS_TOKEN", "twitter-token"),
            ("TWITTER_ACCESS_TOKEN_SECRET", "twitter-token-secret"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let loaded = SentinelConfig::load();

        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let cfg = loaded.unwrap();
        assert_eq!(cfg.poll_interval_secs, 77);
        assert_eq!(cfg.x_bearer_token.as_deref(), Some("tok-single"));
        assert_eq!(cfg.x_api_key.as_deref(), Some("sentinel-key"));
        assert_eq!(cfg.x_access_token_secret.as_deref(), Some("twitter-token-secret"));

        match cfg.x_credentials() {
            Some(XCredentials::OAuth1(oauth)) => {
                assert_eq!(oauth.consumer_key, "sentinel-key");
                assert_eq!(oauth.consumer_secret, "twitter-secret");
                assert_eq!(oauth.access_token, "twitter-token");
            }
            other => panic!("expected OAuth 1.0a credentials, got {other:?}"),
        }
    }

    #[test]
    fn test_bearer_only_credentials() {
        let cfg = SentinelConfig {
            x_bearer_token: Some("tok".into()),
            x_api_key: Some("only-one-of-four".into()),
            ..SentinelConfig::default()
        };
        assert_eq!(cfg.x_credentials(), Some(XCredentials::Bearer("tok".into())));
        assert_eq!(SentinelConfig::default().x_credentials(), None);
    }

    #[test]
    fn test_bad_reference_override() {
        let cfg = SentinelConfig {
            references: Some("react,react".into()),
            ..SentinelConfig::default()
        };
        assert!(matches!(
            cfg.matcher(),
            Err(ConfigError::References(ReferenceError::Duplicate(_)))
        ));
        assert_eq!(SentinelConfig::default().matcher().unwrap().references().len(), 32);
    }
}
