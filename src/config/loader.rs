//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, and merging of environment override sections.

use super::error::{ConfigResult, ConfigurationError};
use super::PilotConfig;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_NAMES: [&str; 2] = ["pilot.yaml", "pilot.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: PilotConfig,
    environment: String,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Load `pilot.yaml` for the environment named by `PILOT_ENV`/`APP_ENV`
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Same as [`load`](Self::load), searching `config_dir` instead of the default directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load from `config_dir` (or the default directory) for an explicit environment
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading pilot configuration ({}) from {}",
            environment,
            config_directory.display()
        );

        let config_file = Self::find_config_file(&config_directory)?;
        let content = Self::read_config_file_safely(&config_file)?;
        let config = Self::parse_with_env(&content, environment, &config_file.display().to_string())?;

        config.validate()?;

        info!(
            environment = %environment,
            config_file = %config_file.display(),
            loop_interval_ms = config.scheduler.loop_interval_ms,
            spec_modes = config.spectroscopy.modes.len(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_file,
        }))
    }

    /// Parse a YAML document, apply the `environment` override section and
    /// deserialize the result.
    pub fn parse_with_env(
        yaml_content: &str,
        environment: &str,
        source: &str,
    ) -> ConfigResult<PilotConfig> {
        let mut yaml_data: YamlValue = if yaml_content.trim().is_empty() {
            YamlValue::Mapping(Default::default())
        } else {
            serde_yaml::from_str(yaml_content)
                .map_err(|e| ConfigurationError::Syntax {
                    origin: source.to_string(),
                    source: e,
                })?
        };

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!("Merging {} overrides", environment);
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        // Environment sections are not part of the schema
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
            map.remove(YamlValue::String(environment.to_string()));
        }

        let mut config: PilotConfig =
            serde_yaml::from_value(yaml_data).map_err(|e| ConfigurationError::Schema {
                origin: source.to_string(),
                source: e,
            })?;
        config.environment = environment.to_string();
        Ok(config)
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// `PILOT_ENV`, then `APP_ENV`, else `development`
    pub fn detect_environment() -> String {
        env::var("PILOT_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();
        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());
            if config_path.exists() {
                debug!(path = %config_path.display(), "Using configuration file");
                return Ok(config_path);
            }
        }
        Err(ConfigurationError::NotFound {
            searched: searched_paths,
        })
    }

    /// Read a configuration file with a size limit
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

        let unreadable = |source: std::io::Error| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(path).map_err(unreadable)?;
        if !metadata.is_file() {
            return Err(ConfigurationError::NotAFile(path.to_path_buf()));
        }
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: MAX_CONFIG_FILE_SIZE,
            });
        }

        std::fs::read_to_string(path).map_err(unreadable)
    }

    /// Deep merge: mappings merge key by key, anything else is replaced
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }
}
