//! Runtime configuration with environment overrides

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_LOG_DIR: &str = ".logs";
/// Spacing between consecutive enqueue submissions within a batch
pub const DEFAULT_ENQUEUE_SPACING: Duration = Duration::from_millis(500);
pub const DEFAULT_ALBUM_ART_SIZE: u32 = 200;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// What happens to a still-pending batch when a new one is scheduled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Abort the not-yet-dispatched enqueues of earlier batches
    #[default]
    Supersede,
    /// Let every batch run to completion independently
    Coexist,
}

impl std::str::FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supersede" => Ok(Self::Supersede),
            "coexist" => Ok(Self::Coexist),
            other => Err(format!("unknown batch policy '{}'", other)),
        }
    }
}

/// Exponential backoff for retryable network failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): base, 2*base, 4*base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    #[serde(with = "duration_ms")]
    pub enqueue_spacing: Duration,
    pub batch_policy: BatchPolicy,
    pub retry: RetryPolicy,
    pub album_art_size: u32,
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            enqueue_spacing: DEFAULT_ENQUEUE_SPACING,
            batch_policy: BatchPolicy::default(),
            retry: RetryPolicy::default(),
            album_art_size: DEFAULT_ALBUM_ART_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `MOODIFY_*` environment variables.
    ///
    /// Unparseable values are logged and skipped.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup("MOODIFY_API_BASE") {
            self.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MOODIFY_ENQUEUE_SPACING_MS") {
            self.enqueue_spacing = Duration::from_millis(ms);
        }
        if let Some(policy) = parse_var::<BatchPolicy>(&lookup, "MOODIFY_BATCH_POLICY") {
            self.batch_policy = policy;
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "MOODIFY_MAX_RETRIES") {
            self.retry.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MOODIFY_POLL_INTERVAL_MS") {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(dir) = lookup("MOODIFY_LOG_DIR") {
            self.log_dir = dir;
        }
        self
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid config override");
            None
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
