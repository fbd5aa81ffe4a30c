use super::{evolution::EvolutionConfig, machine::MachineConfig, traits::ConfigSection};
use crate::error::SageError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `SAGE__MACHINE__STEP_BUDGET=5000`.
pub const ENV_PREFIX: &str = "SAGE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SageConfig {
    pub machine: MachineConfig,
    pub evolution: EvolutionConfig,
}

impl SageConfig {
    pub fn validate(&self) -> Result<(), SageError> {
        validate_section(&self.machine)?;
        validate_section(&self.evolution)?;
        Ok(())
    }

    /// Defaults, then the TOML file (if any), then `SAGE__*` environment
    /// variables.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, SageError> {
        let defaults = config::Config::try_from(&SageConfig::default())
            .map_err(|e| SageError::Configuration(format!("Failed to seed defaults: {}", e)))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: SageConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SageError::Configuration(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

/// Tags a section's validation error with its table name.
fn validate_section<S: ConfigSection>(section: &S) -> Result<(), SageError> {
    section.validate().map_err(|e| match e {
        SageError::Configuration(message) => {
            SageError::Configuration(format!("[{}] {}", S::section_name(), message))
        }
        other => other,
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<SageConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(SageConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SageError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SageError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: SageConfig = toml::from_str(&contents)
            .map_err(|e| SageError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    /// Layered load, see [`SageConfig::load_layered`].
    pub fn load_layered(&self, path: Option<&Path>) -> Result<(), SageError> {
        let config = SageConfig::load_layered(path)?;
        *self.write()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SageError> {
        let config = self.get()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| SageError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| SageError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<SageConfig, SageError> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| SageError::Configuration("Config lock poisoned".to_string()))
    }

    /// Applies `f` and keeps the result only if it still validates.
    pub fn update<F>(&self, f: F) -> Result<(), SageError>
    where
        F: FnOnce(&mut SageConfig),
    {
        let mut config = self.write()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, SageConfig>, SageError> {
        self.config
            .write()
            .map_err(|_| SageError::Configuration("Config lock poisoned".to_string()))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
