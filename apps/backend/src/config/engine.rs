//! Timings and limits of the round engine.

use std::time::Duration;

use super::parse_var;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub betting_window: Duration,
    /// Delay after the betting deadline before bets are pushed to merchants.
    pub push_bets_delay: Duration,
    /// Delay after the betting deadline before empty seats are cleaned.
    pub clean_seats_delay: Duration,
    pub insurance_window: Duration,
    pub rollover_delay: Duration,
    pub repeat_ttl: Duration,
    pub merchant_cache_ttl: Duration,
    /// Attempts for a version-checked update before giving up.
    pub version_retries: u32,
    /// Retries a deferred task gets on transient failure.
    pub task_retries: u32,
    pub default_max_side_bet: f64,
    pub default_decision_time_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            betting_window: Duration::from_secs(15),
            push_bets_delay: Duration::from_secs(1),
            clean_seats_delay: Duration::from_secs(2),
            insurance_window: Duration::from_secs(6),
            rollover_delay: Duration::from_secs(10),
            repeat_ttl: Duration::from_secs(7200),
            merchant_cache_ttl: Duration::from_secs(1800),
            version_retries: 5,
            task_retries: 5,
            default_max_side_bet: 25.0,
            default_decision_time_secs: 15,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `BETTING_WINDOW_SECS`, `INSURANCE_WINDOW_SECS`,
    /// `ROLLOVER_DELAY_SECS`, `REPEAT_TTL_SECS`, `MERCHANT_CACHE_TTL_SECS`,
    /// `VERSION_RETRIES`, `TASK_RETRIES`, `MAX_SIDE_BET` and
    /// `DECISION_TIME_SECS`.
    pub fn from_env() -> Result<Self, AppError> {
        let d = Self::default();
        let secs = |name: &str, default: Duration| -> Result<Duration, AppError> {
            parse_var(name, default.as_secs()).map(Duration::from_secs)
        };

        let config = Self {
            betting_window: secs("BETTING_WINDOW_SECS", d.betting_window)?,
            push_bets_delay: d.push_bets_delay,
            clean_seats_delay: d.clean_seats_delay,
            insurance_window: secs("INSURANCE_WINDOW_SECS", d.insurance_window)?,
            rollover_delay: secs("ROLLOVER_DELAY_SECS", d.rollover_delay)?,
            repeat_ttl: secs("REPEAT_TTL_SECS", d.repeat_ttl)?,
            merchant_cache_ttl: secs("MERCHANT_CACHE_TTL_SECS", d.merchant_cache_ttl)?,
            version_retries: parse_var("VERSION_RETRIES", d.version_retries)?,
            task_retries: parse_var("TASK_RETRIES", d.task_retries)?,
            default_max_side_bet: parse_var("MAX_SIDE_BET", d.default_max_side_bet)?,
            default_decision_time_secs: parse_var(
                "DECISION_TIME_SECS",
                d.default_decision_time_secs,
            )?,
        };

        if config.version_retries == 0 {
            return Err(AppError::config("VERSION_RETRIES must be at least 1"));
        }
        if config.insurance_window.is_zero() {
            return Err(AppError::config("INSURANCE_WINDOW_SECS must be positive"));
        }
        Ok(config)
    }

    /// Seconds shown to clients for the insurance prompt.
    pub fn insurance_decision_secs(&self) -> i64 {
        (self.insurance_window.as_secs() as i64 - 1).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        env::set_var("BETTING_WINDOW_SECS", "20");
        env::set_var("MAX_SIDE_BET", "50");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.betting_window, Duration::from_secs(20));
        assert_eq!(config.default_max_side_bet, 50.0);
        assert_eq!(config.insurance_window, Duration::from_secs(6));
        env::remove_var("BETTING_WINDOW_SECS");
        env::remove_var("MAX_SIDE_BET");
    }

    #[test]
    #[serial]
    fn garbage_value_is_a_config_error() {
        env::set_var("ROLLOVER_DELAY_SECS", "soon");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ROLLOVER_DELAY_SECS"));
        env::remove_var("ROLLOVER_DELAY_SECS");
    }

    #[test]
    fn insurance_prompt_is_one_second_short() {
        assert_eq!(EngineConfig::default().insurance_decision_secs(), 5);
    }
}
