//! Run configuration, loaded from an optional RON file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```ron
//! (
//!     stats: (checkpoint_every: 100, accept_invalid_certs: false),
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use collector_core::RetryPolicy;
use collector_engine::{FetchSettings, StoreEndpoints, DEFAULT_STATS_URL};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub http: HttpConfig,
    pub store: StoreJobConfig,
    pub stats: StatsJobConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreJobConfig {
    pub output: PathBuf,
    pub app_list_url: String,
    pub details_url: String,
    pub reviews_url: String,
    pub request_timeout_secs: u64,
    pub cooldown_secs: u64,
    /// `None` retries rate-limited requests forever.
    pub max_attempts: Option<u32>,
    pub min_interval_ms: Option<u64>,
    /// Only process the first N listed apps.
    pub limit: Option<usize>,
    pub report_every: usize,
}

impl Default for StoreJobConfig {
    fn default() -> Self {
        let endpoints = StoreEndpoints::default();
        Self {
            output: PathBuf::from("Steam_Export.csv"),
            app_list_url: endpoints.app_list_url,
            details_url: endpoints.details_url,
            reviews_url: endpoints.reviews_url,
            request_timeout_secs: 30,
            cooldown_secs: 300,
            max_attempts: Some(3),
            min_interval_ms: None,
            limit: None,
            report_every: 100,
        }
    }
}

impl StoreJobConfig {
    pub fn endpoints(&self) -> StoreEndpoints {
        StoreEndpoints {
            app_list_url: self.app_list_url.clone(),
            details_url: self.details_url.clone(),
            reviews_url: self.reviews_url.clone(),
        }
    }

    pub fn fetch_settings(&self, http: &HttpConfig) -> FetchSettings {
        http.fetch_settings(FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            retry: retry_policy(self.max_attempts, self.cooldown_secs),
            min_interval: self.min_interval_ms.map(Duration::from_millis),
            ..FetchSettings::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsJobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub url: String,
    pub request_timeout_secs: u64,
    pub cooldown_secs: u64,
    pub max_attempts: Option<u32>,
    pub min_interval_ms: Option<u64>,
    pub checkpoint_every: usize,
    pub accept_invalid_certs: bool,
    /// Final output ordering, newest first.
    pub sort_by: Option<String>,
    pub report_every: usize,
}

impl Default for StatsJobConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("Steam_Export.csv"),
            output: PathBuf::from("SteamSpyExport.csv"),
            url: DEFAULT_STATS_URL.to_string(),
            request_timeout_secs: 10,
            cooldown_secs: 60,
            max_attempts: None,
            min_interval_ms: Some(1000),
            checkpoint_every: 500,
            accept_invalid_certs: true,
            sort_by: Some("release_date".to_string()),
            report_every: 100,
        }
    }
}

impl StatsJobConfig {
    pub fn fetch_settings(&self, http: &HttpConfig) -> FetchSettings {
        http.fetch_settings(FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            accept_invalid_certs: self.accept_invalid_certs,
            retry: retry_policy(self.max_attempts, self.cooldown_secs),
            min_interval: self.min_interval_ms.map(Duration::from_millis),
            ..FetchSettings::default()
        })
    }
}

impl HttpConfig {
    fn fetch_settings(&self, job: FetchSettings) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(job.user_agent),
            ..job
        }
    }
}

fn retry_policy(max_attempts: Option<u32>, cooldown_secs: u64) -> RetryPolicy {
    let cooldown = Duration::from_secs(cooldown_secs);
    match max_attempts {
        Some(max) => RetryPolicy::bounded(max, cooldown),
        None => RetryPolicy::unbounded(cooldown),
    }
}

impl CollectorConfig {
    /// Defaults, or the contents of `path` layered over them.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        ron::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }
}
