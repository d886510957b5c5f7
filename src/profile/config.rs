use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AnalyticsError, Result};

pub const DEFAULT_BASE_URL: &str = "https://westus.api.cognitive.microsoft.com/";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Paths of each endpoint, relative to the base url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub key_phrases: String,
    pub sentiment: String,
    pub languages: String,
    pub topics: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            key_phrases: "text/analytics/v2.0/keyPhrases".to_string(),
            sentiment: "text/analytics/v2.0/sentiment".to_string(),
            languages: "text/analytics/v2.0/languages".to_string(),
            topics: "text/analytics/v2.0/topics".to_string(),
        }
    }
}

/// Pacing of the topic-detection poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Pause between a non-terminal poll and the next one.
    pub poll_interval: Duration,
    /// Budget measured from the first poll.
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

impl PollingConfig {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceAuth {
    #[serde(rename = "api_key_env", alias = "env", alias = "api_key")]
    ApiKeyEnv {
        #[serde(default)]
        keys: Vec<String>,
    },
    #[serde(alias = "auth_command")]
    Command { command: Vec<String> },
    #[serde(alias = "header_env")]
    HttpHeaderEnv {
        header: String,
        #[serde(default)]
        keys: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub endpoints: EndpointPaths,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Enables the single fixed-delay retry of the synchronous analyses.
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
    #[serde(default)]
    pub default_language: Option<String>,
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub auth: Option<ServiceAuth>,
}

impl ServiceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let endpoints = [
            ("key_phrases", &self.endpoints.key_phrases),
            ("sentiment", &self.endpoints.sentiment),
            ("languages", &self.endpoints.languages),
            ("topics", &self.endpoints.topics),
        ];
        for (name, path) in endpoints {
            if path.trim().is_empty() {
                return Err(AnalyticsError::Config(format!(
                    "endpoints.{name} must be non-empty"
                )));
            }
        }
        if self.poll_interval_secs == Some(0) {
            return Err(AnalyticsError::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(AnalyticsError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn polling(&self) -> PollingConfig {
        let defaults = PollingConfig::default();
        PollingConfig {
            poll_interval: self
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry_delay_secs.map(Duration::from_secs)
    }

    pub fn default_language(&self) -> Option<&str> {
        self.default_language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty())
    }
}
