use crate::error::{Result, TourError};
use crate::paths::{self, StorageKeys};
use crate::types::Device;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    paths::DEFAULT_KEY_PREFIX.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// TargetingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingConfig {
    /// Window for `new_users` targeting when a tour does not set its own.
    #[serde(default = "default_new_user_days")]
    pub new_user_days: f64,
}

fn default_new_user_days() -> f64 {
    7.0
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            new_user_days: default_new_user_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// ViewportConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_tablet_min")]
    pub tablet_min_width: u32,
    #[serde(default = "default_desktop_min")]
    pub desktop_min_width: u32,
}

fn default_tablet_min() -> u32 {
    768
}

fn default_desktop_min() -> u32 {
    1024
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            tablet_min_width: default_tablet_min(),
            desktop_min_width: default_desktop_min(),
        }
    }
}

impl ViewportConfig {
    pub fn device_for_width(&self, width: u32) -> Device {
        if width < self.tablet_min_width {
            Device::Mobile
        } else if width < self.desktop_min_width {
            Device::Tablet
        } else {
            Device::Desktop
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub targeting: TargetingConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

impl EngineConfig {
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(self.storage.key_prefix.clone())
    }

    /// Load `path`, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match crate::io::read_if_exists(path)? {
            Some(data) if !data.trim().is_empty() => Ok(serde_yaml::from_str(&data)?),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from_root(root: &Path) -> Result<Self> {
        Self::load(&paths::config_path(root))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let prefix = &self.storage.key_prefix;
        if prefix.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "storage.key_prefix is empty".to_string(),
            });
        } else if prefix.chars().any(char::is_whitespace) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("storage.key_prefix '{prefix}' contains whitespace"),
            });
        }

        if self.viewport.desktop_min_width <= self.viewport.tablet_min_width {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "viewport.desktop_min_width ({}) must be greater than tablet_min_width ({})",
                    self.viewport.desktop_min_width, self.viewport.tablet_min_width
                ),
            });
        }

        if self.targeting.new_user_days < 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "targeting.new_user_days is negative ({}); new_users targeting will never match",
                    self.targeting.new_user_days
                ),
            });
        }

        warnings
    }

    /// Fail with every error-level finding from [`validate`](Self::validate).
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TourError::InvalidConfig(errors.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
