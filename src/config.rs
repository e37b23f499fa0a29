//! Router tunables, loaded from TOML with defaults for every missing key

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "joyroute";
const SETTINGS_FILE: &str = "settings.toml";

/// Errors raised while loading or validating [`RouterSettings`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Configuration for one device router
///
/// Each router gets its own copy, so two devices may run with different
/// long-press thresholds or delivery buffers.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RouterSettings {
    /// Minimum hold time before a release also counts as a long press
    pub long_press_delay_ms: u64,

    /// Raw axis magnitude that maps to a normalised value of 1.0
    pub max_axis_value: i32,

    /// Buffer of each subscriber channel created by `register`
    ///
    /// 1 is the closest to a direct hand-off: a subscriber that falls one
    /// event behind stalls the whole device.
    pub delivery_capacity: usize,

    /// Buffer of the raw event source built by `raw_channel`
    pub raw_capacity: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            long_press_delay_ms: 1000,
            max_axis_value: 32767, // Linux joystick driver range
            delivery_capacity: 1,
            raw_capacity: 64,
        }
    }
}

impl RouterSettings {
    pub fn long_press_delay(&self) -> Duration {
        Duration::from_millis(self.long_press_delay_ms)
    }

    pub fn with_long_press_delay(mut self, delay: Duration) -> Self {
        self.long_press_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_axis_value <= 0 {
            return Err(ConfigError::Invalid(format!(
                "max_axis_value must be positive, got {}",
                self.max_axis_value
            )));
        }
        if self.delivery_capacity == 0 {
            return Err(ConfigError::Invalid(
                "delivery_capacity must be at least 1".to_string(),
            ));
        }
        if self.raw_capacity == 0 {
            return Err(ConfigError::Invalid(
                "raw_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: RouterSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading router settings from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(&content)
    }

    /// Default location: `<config_dir>/joyroute/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Loads the settings file from the default location
    ///
    /// A missing file (or a platform without a config dir) yields defaults;
    /// a file that exists but does not parse is still an error.
    pub async fn load_or_default() -> Result<Self, ConfigError> {
        let Some(path) = Self::default_path() else {
            warn!("No config directory on this platform, using default router settings");
            return Ok(Self::default());
        };

        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                let settings = Self::load(&path).await?;
                info!("Loaded router settings from {}", path.display());
                Ok(settings)
            }
            Ok(false) => {
                info!(
                    "No settings file at {}, using default router settings",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }
}
