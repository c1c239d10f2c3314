//! Settings management
//!
//! Sources are layered: defaults, then an optional JSON file, then
//! environment variables, then command-line flags. Out-of-range or
//! malformed body counts never fail; they are clamped or replaced by the
//! default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_BUNNY_COUNT: &str = "BUNNY_COUNT";
pub const ENV_ASSET_DIR: &str = "BUNNY_ASSET_DIR";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Number of simulated bodies, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct BunnyCount(u32);

impl BunnyCount {
    pub const MIN: u32 = 1_000;
    pub const MAX: u32 = 2_000_000;
    pub const DEFAULT: u32 = 100_000;

    pub fn new(raw: u64) -> Self {
        Self(raw.clamp(Self::MIN as u64, Self::MAX as u64) as u32)
    }

    /// Parse a user-supplied value; anything that is not an integer yields
    /// the default.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().replace('_', "");
        match raw.parse::<i64>() {
            Ok(value) => Self::new(value.max(0) as u64),
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring malformed bunny count");
                Self::default()
            }
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for BunnyCount {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<u64> for BunnyCount {
    fn from(raw: u64) -> Self {
        Self::new(raw)
    }
}

impl From<BunnyCount> for u64 {
    fn from(count: BunnyCount) -> Self {
        count.0 as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Bunnymark".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bunny_count: BunnyCount,
    pub window: WindowSettings,
    /// Present with vsync (Fifo) instead of as fast as possible.
    pub vsync: bool,
    /// Run the physics pass on the rayon pool.
    pub parallel_physics: bool,
    /// Wait before rebuilding GPU resources after a device loss.
    pub device_loss_backoff_ms: u64,
    /// Directory holding one PNG per sprite variant.
    pub asset_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bunny_count: BunnyCount::default(),
            window: WindowSettings::default(),
            vsync: true,
            parallel_physics: true,
            device_loss_backoff_ms: 1_000,
            asset_dir: PathBuf::from("assets/pixi_bunnies"),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(count) = lookup(ENV_BUNNY_COUNT) {
            self.bunny_count = BunnyCount::parse(&count);
        }
        if let Some(dir) = lookup(ENV_ASSET_DIR) {
            self.asset_dir = PathBuf::from(dir);
        }
    }

    /// Apply `--bunny-count N` and `--assets DIR` (also `--flag=value`).
    /// Unknown flags are logged and skipped.
    pub fn apply_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            match flag.as_str() {
                "--bunny-count" => match inline.or_else(|| args.next()) {
                    Some(value) => self.bunny_count = BunnyCount::parse(&value),
                    None => tracing::warn!("--bunny-count needs a value"),
                },
                "--assets" => match inline.or_else(|| args.next()) {
                    Some(value) => self.asset_dir = PathBuf::from(value),
                    None => tracing::warn!("--assets needs a value"),
                },
                "--no-vsync" => self.vsync = false,
                "--single-thread" => self.parallel_physics = false,
                other => tracing::warn!(flag = other, "ignoring unknown argument"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped_to_bounds() {
        assert_eq!(BunnyCount::new(0).get(), 1_000);
        assert_eq!(BunnyCount::new(999).get(), 1_000);
        assert_eq!(BunnyCount::new(50_000).get(), 50_000);
        assert_eq!(BunnyCount::new(10_000_000).get(), 2_000_000);
    }

    #[test]
    fn malformed_count_falls_back_to_default() {
        assert_eq!(BunnyCount::parse("lots").get(), 100_000);
        assert_eq!(BunnyCount::parse("").get(), 100_000);
        assert_eq!(BunnyCount::parse("-5").get(), 1_000);
        assert_eq!(BunnyCount::parse(" 1_500_000 ").get(), 1_500_000);
    }

    #[test]
    fn json_fills_missing_fields_and_clamps() {
        let settings = Settings::from_json(r#"{ "bunny_count": 5, "vsync": false }"#).unwrap();
        assert_eq!(settings.bunny_count.get(), 1_000);
        assert!(!settings.vsync);
        assert_eq!(settings.window, WindowSettings::default());
        assert!(settings.parallel_physics);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = Settings::default();
        let text = serde_json::to_string(&settings).unwrap();
        assert_eq!(Settings::from_json(&text).unwrap(), settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("/nonexistent/bunnymark.json").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn bad_file_is_reported() {
        let path = std::env::temp_dir().join("bunny_services_bad_settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn vars_override_defaults() {
        let mut settings = Settings::default();
        settings.apply_vars(|key| match key {
            ENV_BUNNY_COUNT => Some("250000".to_string()),
            ENV_ASSET_DIR => Some("/tmp/bunnies".to_string()),
            _ => None,
        });
        assert_eq!(settings.bunny_count.get(), 250_000);
        assert_eq!(settings.asset_dir, PathBuf::from("/tmp/bunnies"));
    }

    #[test]
    fn args_override_everything() {
        let mut settings = Settings::default();
        settings.apply_args([
            "--bunny-count",
            "3000000",
            "--assets=sprites",
            "--no-vsync",
            "--bogus",
            "--single-thread",
        ]);
        assert_eq!(settings.bunny_count.get(), 2_000_000);
        assert_eq!(settings.asset_dir, PathBuf::from("sprites"));
        assert!(!settings.vsync);
        assert!(!settings.parallel_physics);
    }
}
