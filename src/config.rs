// Engine configuration, read from the environment (and a .env file if present)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::calendar::CalendarMapper;
use crate::error::{EngineError, EngineResult};
use crate::time_controller::{
    ResponseCurve, DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, DEFAULT_RATE_CEILING, DEFAULT_TIME_SCALE,
    SCALE_STEP,
};

pub const ENV_API_URL: &str = "SOLAR_API_URL";
pub const ENV_EPOCH: &str = "SOLAR_EPOCH";
pub const ENV_TIME_SCALE: &str = "SOLAR_TIME_SCALE";
pub const ENV_MIN_SCALE: &str = "SOLAR_MIN_SCALE";
pub const ENV_MAX_SCALE: &str = "SOLAR_MAX_SCALE";
pub const ENV_RATE_CEILING: &str = "SOLAR_RATE_CEILING";
pub const ENV_FPS: &str = "SOLAR_FPS";
pub const ENV_RUN_SECONDS: &str = "SOLAR_RUN_SECONDS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Remote simulation service; `None` uses the bundled catalog
    pub api_base_url: Option<String>,
    /// Calendar date of simulation time zero; `None` means today
    pub epoch: Option<NaiveDate>,
    pub time_scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub rate_ceiling: f64,
    pub target_fps: u32,
    pub run_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            epoch: None,
            time_scale: DEFAULT_TIME_SCALE,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            rate_ceiling: DEFAULT_RATE_CEILING,
            target_fps: 60,
            run_seconds: 10.0,
        }
    }
}

impl EngineConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> EngineResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup(ENV_API_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let epoch = match lookup(ENV_EPOCH) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|e| EngineError::Config(format!("{}={}: {}", ENV_EPOCH, raw, e)))?,
            ),
            None => None,
        };

        let config = Self {
            api_base_url,
            epoch,
            time_scale: parse_var(&lookup, ENV_TIME_SCALE)?.unwrap_or(defaults.time_scale),
            min_scale: parse_var(&lookup, ENV_MIN_SCALE)?.unwrap_or(defaults.min_scale),
            max_scale: parse_var(&lookup, ENV_MAX_SCALE)?.unwrap_or(defaults.max_scale),
            rate_ceiling: parse_var(&lookup, ENV_RATE_CEILING)?.unwrap_or(defaults.rate_ceiling),
            target_fps: parse_var(&lookup, ENV_FPS)?.unwrap_or(defaults.target_fps),
            run_seconds: parse_var(&lookup, ENV_RUN_SECONDS)?.unwrap_or(defaults.run_seconds),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err(EngineError::Config(format!(
                "minimum scale must be positive, got {}",
                self.min_scale
            )));
        }
        if !(self.max_scale.is_finite() && self.max_scale > self.min_scale) {
            return Err(EngineError::Config(format!(
                "maximum scale {} must exceed minimum {}",
                self.max_scale, self.min_scale
            )));
        }
        if !(self.rate_ceiling.is_finite() && self.rate_ceiling > 0.0) {
            return Err(EngineError::Config(format!(
                "rate ceiling must be positive, got {}",
                self.rate_ceiling
            )));
        }
        if !self.response_curve().resolves_step(SCALE_STEP) {
            return Err(EngineError::Config(format!(
                "rate ceiling {} flattens the speed curve below scale {}",
                self.rate_ceiling, self.max_scale
            )));
        }
        if self.target_fps == 0 {
            return Err(EngineError::Config("frame rate must be non-zero".to_string()));
        }
        if !(self.run_seconds.is_finite() && self.run_seconds >= 0.0) {
            return Err(EngineError::Config(format!(
                "run length must be non-negative, got {}",
                self.run_seconds
            )));
        }
        Ok(())
    }

    pub fn response_curve(&self) -> ResponseCurve {
        ResponseCurve::new(self.min_scale, self.max_scale, self.rate_ceiling)
    }

    pub fn calendar(&self) -> CalendarMapper {
        match self.epoch {
            Some(epoch) => CalendarMapper::new(epoch),
            None => CalendarMapper::session_start(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> EngineResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EngineError::Config(format!("{}={}: {}", key, raw, e))),
        None => Ok(None),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.response_curve(), ResponseCurve::default());
    }

    #[test]
    fn test_reads_values() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "http://localhost:5000/"),
            (ENV_EPOCH, "2023-01-01"),
            (ENV_TIME_SCALE, "4.5"),
            (ENV_FPS, "30"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.epoch, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(config.time_scale, 4.5);
        assert_eq!(config.target_fps, 30);
        assert_eq!(
            config.calendar().epoch(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_TIME_SCALE, "fast")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_EPOCH, "01/02/2023")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_bounds_are_checked() {
        let err = EngineConfig::from_lookup(lookup_from(&[
            (ENV_MIN_SCALE, "10"),
            (ENV_MAX_SCALE, "5"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("must exceed"));

        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_RATE_CEILING, "0")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_configured_ceiling_keeps_curve_increasing() {
        let config = EngineConfig::from_lookup(lookup_from(&[(ENV_RATE_CEILING, "1")])).unwrap();
        let curve = config.response_curve();
        assert!(curve.rate(20.0) < curve.rate(30.0));
        assert!(curve.rate(config.max_scale - SCALE_STEP) < curve.rate(config.max_scale));
        assert!(curve.rate(config.max_scale) <= config.rate_ceiling);

        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_RATE_CEILING, "1e-12")])).unwrap_err();
        assert!(err.to_string().contains("flattens"));
    }

    #[test]
    fn test_blank_url_means_bundled() {
        let config = EngineConfig::from_lookup(lookup_from(&[(ENV_API_URL, "  ")])).unwrap();
        assert_eq!(config.api_base_url, None);
    }
}
