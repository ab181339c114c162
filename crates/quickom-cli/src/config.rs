//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/quickom/config.toml` by default.
//!
//! The API key supports secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quickom_core::{AudioMode, MeetingOptions};
use quickom_providers::CallBudget;
use quickom_providers::quickom::QuickomConfig;
use quickom_server::SyncConfig;
use quickom_server::config::JOIN_WINDOWS;

use crate::secret::{self, SecretError};

/// Errors raised while loading or checking the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no API key configured; set `api_key` in the [provider] section")]
    MissingApiKey,

    #[error("failed to resolve api_key: {0}")]
    Secret(#[from] SecretError),

    #[error("invalid base_url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("licenses_count must be greater than zero when recycle_licenses is enabled")]
    MissingLicensesCount,

    #[error("first_able_to_join must be one of {allowed:?}, got {value}")]
    InvalidJoinWindow { value: u32, allowed: [u32; 8] },

    #[error("{0}")]
    Invalid(String),
}

/// Configuration for the quickom client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Provider account settings.
    pub provider: ProviderSettings,

    /// Defaults applied to new meetings.
    pub defaults: DefaultSettings,

    /// Reconciliation settings.
    pub sync: SyncSettings,
}

/// Provider account settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key (supports `pass::` and `env::` prefixes).
    pub api_key: Option<String>,

    /// API root.
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Attempts per request for transport failures.
    pub max_retries: u32,

    /// Report endpoint calls allowed per process.
    pub report_call_budget: u32,

    /// Fallback timezone for meetings that carry none.
    pub timezone: String,

    /// Free licenses of inactive hosts when the account runs out.
    pub recycle_licenses: bool,

    /// Licenses held by the account.
    pub licenses_count: Option<u32>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: QuickomConfig::DEFAULT_BASE_URL.to_string(),
            timeout_secs: QuickomConfig::DEFAULT_TIMEOUT_SECS,
            max_retries: QuickomConfig::DEFAULT_MAX_RETRIES,
            report_call_budget: 2000,
            timezone: "UTC".to_string(),
            recycle_licenses: false,
            licenses_count: None,
        }
    }
}

/// Defaults for new meetings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    pub host_video: bool,
    pub participants_video: bool,
    pub join_before_host: bool,
    pub audio: AudioMode,
    /// Minutes before the start a meeting opens.
    pub first_able_to_join: u32,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        let options = MeetingOptions::default();
        Self {
            host_video: options.host_video,
            participants_video: options.participants_video,
            join_before_host: options.join_before_host,
            audio: options.audio,
            first_able_to_join: quickom_server::config::DEFAULT_FIRST_ABLE_TO_JOIN,
        }
    }
}

impl DefaultSettings {
    /// Meeting options for a new instance.
    pub fn meeting_options(&self) -> MeetingOptions {
        MeetingOptions {
            join_before_host: self.join_before_host,
            host_video: self.host_video,
            participants_video: self.participants_video,
            audio: self.audio,
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Seconds between passes in `watch` mode.
    pub interval_secs: u64,

    /// Longest a single pass may run, 0 for no limit.
    pub deadline_secs: u64,

    /// JSON store file. Defaults to the data directory.
    pub store_path: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            deadline_secs: defaults.deadline.map_or(0, |d| d.as_secs()),
            store_path: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickom")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickom")
    }

    /// Store file, falling back to the data directory.
    pub fn store_path(&self) -> PathBuf {
        self.sync
            .store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("store.json"))
    }

    /// Checks every section without contacting the provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider_config()?;
        if self.provider.recycle_licenses && self.provider.licenses_count.unwrap_or(0) == 0 {
            return Err(ConfigError::MissingLicensesCount);
        }
        self.sync_config()?;
        Ok(())
    }

    /// Builds the provider client configuration, resolving the API key.
    pub fn provider_config(&self) -> Result<QuickomConfig, ConfigError> {
        let raw_key = self
            .provider
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let api_key = secret::resolve(raw_key)?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let config = QuickomConfig::new(&self.provider.base_url).map_err(|e| {
            ConfigError::InvalidUrl {
                url: self.provider.base_url.clone(),
                message: e.to_string(),
            }
        })?;
        let retry_backoff = config.retry_backoff;
        Ok(config
            .with_api_key(api_key)
            .with_timeout(Duration::from_secs(self.provider.timeout_secs.max(1)))
            .with_retries(self.provider.max_retries, retry_backoff)
            .with_timezone(&self.provider.timezone))
    }

    /// Report call budget for one process.
    pub fn call_budget(&self) -> CallBudget {
        CallBudget::new(self.provider.report_call_budget)
    }

    /// Builds the sync configuration.
    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        if !JOIN_WINDOWS.contains(&self.defaults.first_able_to_join) {
            return Err(ConfigError::InvalidJoinWindow {
                value: self.defaults.first_able_to_join,
                allowed: JOIN_WINDOWS,
            });
        }
        let deadline = match self.sync.deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let config = SyncConfig::new(self.store_path())
            .with_interval(Duration::from_secs(self.sync.interval_secs))
            .with_deadline(deadline)
            .with_first_able_to_join(self.defaults.first_able_to_join);
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}
