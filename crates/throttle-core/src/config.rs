use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use tokio::sync::Semaphore;

use crate::error::ConfigError;

pub const ENV_CONCURRENCY: &str = "THROTTLE_CONCURRENCY";
pub const ENV_MAX_DURATION_MS: &str = "THROTTLE_MAX_DURATION_MS";
pub const ENV_REPORT_INTERVAL_MS: &str = "THROTTLE_REPORT_INTERVAL_MS";
pub const ENV_FAILURE_RATE: &str = "THROTTLE_FAILURE_RATE";

const DEFAULT_MAX_DURATION_MS: u64 = 5_000;
const DEFAULT_REPORT_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Upper bound of simultaneously running tasks (default: host parallelism).
    pub concurrency: usize,
    /// Simulated work sleeps for a uniform duration in `[0, max_duration_ms)`.
    pub max_duration_ms: u64,
    /// Period of progress snapshots.
    pub report_interval_ms: u64,
    /// Probability in `[0, 1]` that a simulated work step fails.
    pub failure_rate: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            failure_rate: 0.0,
        }
    }
}

impl DispatchConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_duration_ms(mut self, max_duration_ms: u64) -> Self {
        self.max_duration_ms = max_duration_ms;
        self
    }

    pub fn with_report_interval_ms(mut self, report_interval_ms: u64) -> Self {
        self.report_interval_ms = report_interval_ms;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate;
        self
    }

    #[inline]
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ConcurrencyTooLarge(self.concurrency));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::ZeroReportInterval);
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::FailureRateOutOfRange(self.failure_rate));
        }
        Ok(())
    }

    /// Defaults overridden by `THROTTLE_*` environment variables, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DispatchConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, ENV_CONCURRENCY)? {
            cfg.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_DURATION_MS)? {
            cfg.max_duration_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_REPORT_INTERVAL_MS)? {
            cfg.report_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_FAILURE_RATE)? {
            cfg.failure_rate = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
}
