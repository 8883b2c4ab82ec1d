use crate::domain::payment_method::MethodBudgetTable;
use crate::error::{HandlerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for polling and challenge completion. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Minimum spacing between two polls of the same budget.
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    /// Lowest timeout handed to a retrieval, however little budget is left.
    #[serde(with = "duration_secs")]
    pub network_timeout_floor: Duration,
    /// Budget for waiting out a `processing` status.
    #[serde(with = "duration_secs")]
    pub processing_budget: Duration,
    /// Budget synthesized after a failed retrieval when no other budget exists.
    #[serde(with = "duration_secs")]
    pub minimal_budget: Duration,
    pub challenge_completion_retries: u32,
    #[serde(with = "duration_secs")]
    pub challenge_completion_retry_delay: Duration,
    pub method_budgets: MethodBudgetTable,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            network_timeout_floor: Duration::from_secs(60),
            processing_budget: Duration::from_secs(30),
            minimal_budget: Duration::from_secs(1),
            challenge_completion_retries: 5,
            challenge_completion_retry_delay: Duration::from_secs(2),
            method_budgets: MethodBudgetTable::default(),
        }
    }
}

impl HandlerConfig {
    /// Loads a JSON config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(HandlerError::ConfigError(
                "poll_interval must be positive".to_string(),
            ));
        }
        if self.network_timeout_floor.is_zero() {
            return Err(HandlerError::ConfigError(
                "network_timeout_floor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serde adapter for durations written as (fractional) seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.network_timeout_floor, Duration::from_secs(60));
        assert_eq!(config.processing_budget, Duration::from_secs(30));
        assert_eq!(config.minimal_budget, Duration::from_secs(1));
        assert_eq!(config.challenge_completion_retries, 5);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"processing_budget": 10.5, "method_budgets": {{"card": 20}}}}"#
        )
        .unwrap();

        let config = HandlerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.processing_budget, Duration::from_millis(10_500));
        assert_eq!(config.method_budgets.card, Duration::from_secs(20));
        assert_eq!(config.method_budgets.redirect_wallets, Duration::from_secs(5));
        assert_eq!(config.challenge_completion_retries, 5);
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"poll_interval": 0}}"#).unwrap();

        let err = HandlerConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, HandlerError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_negative_duration() {
        let result: std::result::Result<HandlerConfig, _> =
            serde_json::from_str(r#"{"minimal_budget": -1}"#);
        assert!(result.is_err());
    }
}
