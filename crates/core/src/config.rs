//! Engine start-up configuration.
//!
//! Values come from [`EngineConfig::default`] overlaid with `RINGFRAME_*`
//! environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How frames are driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveMode {
    /// The caller's loop renders one frame per tick.
    #[default]
    SingleThreaded,
    /// A pool of worker threads render continuously against disjoint slots.
    Concurrent,
}

impl FromStr for DriveMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single-threaded" | "st" => Ok(Self::SingleThreaded),
            "concurrent" | "multi" | "mt" => Ok(Self::Concurrent),
            other => Err(Error::Config(format!("unknown drive mode '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    /// Enables verbose diagnostics and validation layers.
    pub debug: bool,
    pub drive: DriveMode,
    /// Explicit worker count for [`DriveMode::Concurrent`].
    pub workers: Option<usize>,
    /// Number of per-instance transforms each frame slot can hold.
    pub transform_capacity: usize,
    /// Where per-category textures are looked up. Missing files fall back to
    /// generated patterns.
    pub texture_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            debug: false,
            drive: DriveMode::SingleThreaded,
            workers: None,
            transform_capacity: 1024,
            texture_dir: PathBuf::from("textures"),
        }
    }
}

impl EngineConfig {
    /// Builds a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is present but malformed, or if
    /// the resulting configuration fails [`EngineConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("RINGFRAME_WIDTH") {
            config.width = parse("RINGFRAME_WIDTH", &v)?;
        }
        if let Some(v) = lookup("RINGFRAME_HEIGHT") {
            config.height = parse("RINGFRAME_HEIGHT", &v)?;
        }
        if let Some(v) = lookup("RINGFRAME_DEBUG") {
            config.debug = parse_flag("RINGFRAME_DEBUG", &v)?;
        }
        if let Some(v) = lookup("RINGFRAME_DRIVE") {
            config.drive = v.parse()?;
        }
        if let Some(v) = lookup("RINGFRAME_WORKERS") {
            config.workers = Some(parse("RINGFRAME_WORKERS", &v)?);
        }
        if let Some(v) = lookup("RINGFRAME_TRANSFORMS") {
            config.transform_capacity = parse("RINGFRAME_TRANSFORMS", &v)?;
        }
        if let Some(v) = lookup("RINGFRAME_TEXTURES") {
            config.texture_dir = PathBuf::from(v.trim());
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.transform_capacity == 0 {
            return Err(Error::Config(
                "transform capacity must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Worker count for the concurrent drive: the explicit value if set,
    /// otherwise one worker per half of the frames in flight.
    pub fn worker_count(&self, max_frames_in_flight: usize) -> usize {
        self.workers
            .unwrap_or(max_frames_in_flight / 2)
            .max(1)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: cannot parse '{value}'")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!("{key}: expected a boolean, got '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.drive, DriveMode::SingleThreaded);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("RINGFRAME_WIDTH", "640"),
            ("RINGFRAME_HEIGHT", "480"),
            ("RINGFRAME_DEBUG", "true"),
            ("RINGFRAME_DRIVE", "concurrent"),
            ("RINGFRAME_WORKERS", "3"),
            ("RINGFRAME_TEXTURES", "assets/tex"),
        ]))
        .unwrap();

        assert_eq!((config.width, config.height), (640, 480));
        assert!(config.debug);
        assert_eq!(config.drive, DriveMode::Concurrent);
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.texture_dir, PathBuf::from("assets/tex"));
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let err = EngineConfig::from_lookup(lookup(&[("RINGFRAME_WIDTH", "wide")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = EngineConfig::from_lookup(lookup(&[("RINGFRAME_DRIVE", "sideways")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = EngineConfig {
            height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            transform_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_count_is_half_the_ring() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_count(6), 3);
        assert_eq!(config.worker_count(3), 1);
        assert_eq!(config.worker_count(1), 1);

        let config = EngineConfig {
            workers: Some(4),
            ..Default::default()
        };
        assert_eq!(config.worker_count(2), 4);
    }
}
