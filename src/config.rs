use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::TleSource;
use crate::tracker::{
    Interpolation, LocalFrame, TrackerSettings, DEFAULT_BODY, DEFAULT_DISPLAY_DISTANCE_M,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration {value:?}: {message}")]
    InvalidDuration { value: String, message: String },
    #[error("invalid display distance {0}: must be a positive number of meters")]
    InvalidDistance(f64),
    #[error("invalid observer coordinates: {0:?}")]
    InvalidCoordinates(String),
    #[error("invalid TLE source: {0:?}")]
    InvalidSource(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tle_source: String,
    pub body: String,
    pub observer: ObserverConfig,
    pub tick_interval: String,
    pub display_distance_m: f64,
    pub history: HistoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tle_source: default_tle_source(),
            body: DEFAULT_BODY.to_string(),
            observer: ObserverConfig::default(),
            tick_interval: "1s".to_string(),
            display_distance_m: DEFAULT_DISPLAY_DISTANCE_M,
            history: HistoryConfig::default(),
        }
    }
}

fn default_tle_source() -> String {
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=visual&FORMAT=tle".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    /// `"lat, lon"` in degrees.
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            coordinates: "0.0, 0.0".to_string(),
            altitude_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub interpolation: Interpolation,
    /// Unbounded when absent.
    pub max_samples: Option<usize>,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn source(&self) -> Result<TleSource, ConfigError> {
        if self.tle_source.trim().is_empty() {
            return Err(ConfigError::InvalidSource(self.tle_source.clone()));
        }
        self.tle_source
            .parse()
            .map_err(|_| ConfigError::InvalidSource(self.tle_source.clone()))
    }

    pub fn tick_interval(&self) -> Result<Duration, ConfigError> {
        let interval = humantime::parse_duration(self.tick_interval.trim()).map_err(|e| {
            ConfigError::InvalidDuration {
                value: self.tick_interval.clone(),
                message: e.to_string(),
            }
        })?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidDuration {
                value: self.tick_interval.clone(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(interval)
    }

    pub fn local_frame(&self) -> Result<LocalFrame, ConfigError> {
        LocalFrame::from_coordinates(&self.observer.coordinates, Some(self.observer.altitude_m))
            .ok_or_else(|| ConfigError::InvalidCoordinates(self.observer.coordinates.clone()))
    }

    pub fn display_distance(&self) -> Result<f64, ConfigError> {
        let distance = self.display_distance_m;
        if distance.is_finite() && distance > 0.0 {
            Ok(distance)
        } else {
            Err(ConfigError::InvalidDistance(distance))
        }
    }

    pub fn tracker_settings(&self) -> Result<TrackerSettings, ConfigError> {
        Ok(TrackerSettings {
            body: self.body.clone(),
            display_distance_m: self.display_distance()?,
            interpolation: self.history.interpolation,
            max_history_samples: self.history.max_samples,
        })
    }
}
