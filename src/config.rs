use crate::coefficients::PhysiologyCoefficients;
use crate::error::{Result, StaminaError};
use crate::logging::LogConfig;
use crate::profile::UserProfileParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Engine configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Logging setup for binaries
    pub logging: LogConfig,

    /// Profile used for users created without explicit parameters
    pub profile: UserProfileParams,

    /// Empirical physiology coefficients
    pub coefficients: PhysiologyCoefficients,

    /// Session replay preferences
    pub replay: ReplaySettings,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Session replay preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Seconds between trace rows, None to disable the trace
    pub trace_interval_secs: Option<i64>,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            trace_interval_secs: Some(60),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metadata: ConfigMetadata::default(),
            logging: LogConfig::default(),
            profile: UserProfileParams::default(),
            coefficients: PhysiologyCoefficients::default(),
            replay: ReplaySettings::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.coefficients.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config = Self::load_from_string(&content)?;
        info!(path = %path.as_ref().display(), "Configuration loaded");
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_content = toml::to_string_pretty(&*self)
            .map_err(|e| StaminaError::Configuration(format!("cannot serialize configuration: {}", e)))?;
        fs::write(&path, toml_content)?;
        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stamina")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(error) => {
                warn!(
                    path = %config_path.display(),
                    %error,
                    "Configuration unavailable, using defaults"
                );
                Self::default()
            }
        }
    }
}
