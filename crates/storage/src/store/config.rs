#![forbid(unsafe_code)]

use std::time::Duration;
use tracing::warn;

pub const LOCK_TIMEOUT_ENV: &str = "WORKTRACK_LOCK_TIMEOUT_MS";
pub const LOCK_BACKOFF_ENV: &str = "WORKTRACK_LOCK_BACKOFF_MS";
pub const LOCK_BACKOFF_MAX_ENV: &str = "WORKTRACK_LOCK_BACKOFF_MAX_MS";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockConfig {
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCK_TIMEOUT,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl LockConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = millis_override(&lookup, LOCK_TIMEOUT_ENV) {
            config.timeout = value;
        }
        if let Some(value) = millis_override(&lookup, LOCK_BACKOFF_ENV) {
            config.initial_backoff = value;
        }
        if let Some(value) = millis_override(&lookup, LOCK_BACKOFF_MAX_ENV) {
            config.max_backoff = value;
        }
        if config.max_backoff < config.initial_backoff {
            warn!(
                initial_ms = config.initial_backoff.as_millis() as u64,
                max_ms = config.max_backoff.as_millis() as u64,
                "lock backoff cap below initial delay; using initial delay as cap"
            );
            config.max_backoff = config.initial_backoff;
        }
        config
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub lock: LockConfig,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            lock: LockConfig::from_env(),
        }
    }
}

fn millis_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!(key, value = %raw, "ignoring invalid lock setting");
            None
        }
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}
