use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub use feedback::DEFAULT_LOGICAL_HEIGHT;

pub const DEFAULT_NOISE_SEED: u64 = 0;
pub const DEFAULT_WINDOW: WindowSize = WindowSize {
    width: 1280,
    height: 720,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantSetting {
    #[default]
    Feedback,
    Noise,
}

impl FromStr for VariantSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "feedback" => Ok(VariantSetting::Feedback),
            "noise" => Ok(VariantSetting::Noise),
            other => Err(format!(
                "invalid variant '{other}'; expected 'feedback' or 'noise'"
            )),
        }
    }
}

impl fmt::Display for VariantSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantSetting::Feedback => f.write_str("feedback"),
            VariantSetting::Noise => f.write_str("noise"),
        }
    }
}

impl<'de> Deserialize<'de> for VariantSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `WIDTHxHEIGHT` (e.g. `1920x1080`).
impl FromStr for WindowSize {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (width, height) = raw
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|err| format!("invalid width in '{raw}': {err}"))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|err| format!("invalid height in '{raw}': {err}"))?;
        if width == 0 || height == 0 {
            return Err(format!("size '{raw}' must be non-zero in both dimensions"));
        }
        Ok(WindowSize { width, height })
    }
}

/// Partial configuration as written in a file or assembled from CLI flags.
/// Every field is optional; [`EffectConfig::resolve`] fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EffectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowSize>,
}

/// Fully resolved settings, ready to print or hand to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub variant: VariantSetting,
    pub logical_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
    pub noise_seed: u64,
    pub window: WindowSize,
}

impl EffectConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EffectConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logical_height == Some(0) {
            return Err(ConfigError::Invalid(
                "logical_height must be greater than zero".into(),
            ));
        }

        if let Some(window) = self.window {
            if window.width == 0 || window.height == 0 {
                return Err(ConfigError::Invalid(format!(
                    "window size {window} must be non-zero in both dimensions"
                )));
            }
        }

        if let Some(seed) = &self.seed {
            if seed.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("seed path may not be empty".into()));
            }
        }

        // TOML integers are signed 64-bit.
        if let Some(noise_seed) = self.noise_seed {
            if noise_seed > i64::MAX as u64 {
                return Err(ConfigError::Invalid(format!(
                    "noise_seed {noise_seed} exceeds {}",
                    i64::MAX
                )));
            }
        }

        Ok(())
    }

    /// Layers `overrides` on top of `self`; fields set in `overrides` win.
    pub fn merged_with(self, overrides: EffectConfig) -> EffectConfig {
        EffectConfig {
            variant: overrides.variant.or(self.variant),
            logical_height: overrides.logical_height.or(self.logical_height),
            seed: overrides.seed.or(self.seed),
            noise_seed: overrides.noise_seed.or(self.noise_seed),
            window: overrides.window.or(self.window),
        }
    }

    pub fn resolve(&self) -> ResolvedConfig {
        ResolvedConfig {
            variant: self.variant.unwrap_or_default(),
            logical_height: self.logical_height.unwrap_or(DEFAULT_LOGICAL_HEIGHT),
            seed: self.seed.clone(),
            noise_seed: self.noise_seed.unwrap_or(DEFAULT_NOISE_SEED),
            window: self.window.unwrap_or(DEFAULT_WINDOW),
        }
    }
}

impl ResolvedConfig {
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}
