use std::{path::{Path, PathBuf}, str::FromStr, time::Duration};

use run_tracker_lib::geo::{DisplayMode, KCAL_PER_KM};

use crate::{session::MIN_SAVE_DISTANCE_KM, TrackerError};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Where the run archive lives. `None` means `data/` under the project root.
    pub data_dir: Option<PathBuf>,
    pub tick_interval: Duration,
    pub min_save_distance_km: f64,
    pub calories_per_km: f64,
    pub display: DisplayMode,
    pub recent_runs_limit: usize,
    /// How long a position source may go without a sample.
    pub sample_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            tick_interval: Duration::from_secs(1),
            min_save_distance_km: MIN_SAVE_DISTANCE_KM,
            calories_per_km: KCAL_PER_KM,
            display: DisplayMode::Pace,
            recent_runs_limit: 10,
            sample_timeout: Duration::from_secs(5),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| TrackerError::Config(format!("Failed to read {:?}: {err}", path)))?;
        Self::parse(&text)
    }

    /// Parses `key = value` lines. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, TrackerError> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(TrackerError::Config(format!("Line {} is not key = value: {line}", number + 1)));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "data_dir" => config.data_dir = Some(PathBuf::from(value)),
                "tick_interval_ms" => config.tick_interval = Duration::from_millis(parse_value(key, value)?),
                "min_save_distance_km" => config.min_save_distance_km = parse_value(key, value)?,
                "calories_per_km" => config.calories_per_km = parse_value(key, value)?,
                "display" => config.display = match value {
                    "pace" => DisplayMode::Pace,
                    "speed" => DisplayMode::Speed,
                    _ => return Err(TrackerError::Config(format!("display must be pace or speed, got {value}"))),
                },
                "recent_runs_limit" => config.recent_runs_limit = parse_value(key, value)?,
                "sample_timeout_ms" => config.sample_timeout = Duration::from_millis(parse_value(key, value)?),
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), TrackerError> {
        if self.tick_interval.is_zero() {
            return Err(TrackerError::Config("tick_interval_ms must be positive".into()));
        }
        if self.sample_timeout.is_zero() {
            return Err(TrackerError::Config("sample_timeout_ms must be positive".into()));
        }
        if !self.min_save_distance_km.is_finite() || self.min_save_distance_km < 0. {
            return Err(TrackerError::Config("min_save_distance_km must be a non-negative number".into()));
        }
        if !self.calories_per_km.is_finite() || self.calories_per_km < 0. {
            return Err(TrackerError::Config("calories_per_km must be a non-negative number".into()));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, TrackerError> {
    value.parse().map_err(|_| TrackerError::Config(format!("Invalid value for {key}: {value}")))
}
