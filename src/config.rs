//! Configuration management for the staging validator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (validator.toml)
//! - Environment variables (VALIDATOR__*)
//!
//! ## Example config file (validator.toml):
//! ```toml
//! [input]
//! delimiter = "|"
//! file_masks = ["*.csv"]
//!
//! [output]
//! directory = "validated"
//! accepted_prefix = "accepted-"
//! rejected_prefix = "rejected-"
//! reasons_column = "rejection_reasons"
//! reason_separator = "; "
//!
//! [registry]
//! path = "schemas"
//!
//! [[schemas]]
//! name = "staged"
//! file_masks = ["staged_*.csv"]
//! columns = [
//!     { name = "id", type = "integer" },
//!     { name = "created_at", type = "timestamp", format = "%Y-%m-%d %H:%M:%S" },
//! ]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, ValidatorError};
use crate::registry::SchemaRegistry;
use crate::schema::SchemaDefinition;
use crate::splitter::{
    SplitOptions, DEFAULT_ACCEPTED_PREFIX, DEFAULT_REASONS_COLUMN, DEFAULT_REASON_SEPARATOR,
    DEFAULT_REJECTED_PREFIX,
};

/// Main configuration for the validator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Schema directory settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Inline schema definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<SchemaDefinition>,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field delimiter, a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Masks used to pick files when a directory is given
    #[serde(default = "default_file_masks")]
    pub file_masks: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where partitions are written (default: next to the source)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_accepted_prefix")]
    pub accepted_prefix: String,

    #[serde(default = "default_rejected_prefix")]
    pub rejected_prefix: String,

    /// Reasons column on the rejected file; empty disables it
    #[serde(default = "default_reasons_column")]
    pub reasons_column: String,

    /// Joins several reasons for one row
    #[serde(default = "default_reason_separator")]
    pub reason_separator: String,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory of schema definition files
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_delimiter() -> char {
    '|'
}

fn default_file_masks() -> Vec<String> {
    vec!["*.csv".to_string(), "*.txt".to_string()]
}

fn default_accepted_prefix() -> String {
    DEFAULT_ACCEPTED_PREFIX.to_string()
}

fn default_rejected_prefix() -> String {
    DEFAULT_REJECTED_PREFIX.to_string()
}

fn default_reasons_column() -> String {
    DEFAULT_REASONS_COLUMN.to_string()
}

fn default_reason_separator() -> String {
    DEFAULT_REASON_SEPARATOR.to_string()
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("schemas")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            file_masks: default_file_masks(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            accepted_prefix: default_accepted_prefix(),
            rejected_prefix: default_rejected_prefix(),
            reasons_column: default_reasons_column(),
            reason_separator: default_reason_separator(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["validator.toml", ".validator.toml", "config/validator.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "staging-validator") {
            let xdg_config = config_dir.config_dir().join("validator.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (VALIDATOR__*)
        builder = builder.add_source(
            Environment::with_prefix("VALIDATOR")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Split options derived from the input and output sections
    pub fn split_options(&self) -> Result<SplitOptions> {
        let delimiter = self.input.delimiter;
        if !delimiter.is_ascii() {
            return Err(ValidatorError::InvalidDelimiter(format!(
                "{:?} is not a single-byte character",
                delimiter
            )));
        }

        let reasons_column = Some(self.output.reasons_column.trim())
            .filter(|c| !c.is_empty())
            .map(String::from);

        let options = SplitOptions {
            delimiter: delimiter as u8,
            accepted_prefix: self.output.accepted_prefix.clone(),
            rejected_prefix: self.output.rejected_prefix.clone(),
            reasons_column,
            reason_separator: self.output.reason_separator.clone(),
            output_dir: self.output.directory.clone(),
        };
        options.validate()?;
        Ok(options)
    }

    /// Registry with the schema directory plus inline schemas
    pub fn build_registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::open(self.registry_path())?;
        for definition in &self.schemas {
            registry.register_definition(definition)?;
        }
        Ok(registry)
    }

    /// Get the registry path (resolves relative paths)
    pub fn registry_path(&self) -> PathBuf {
        if self.registry.path.is_absolute() {
            self.registry.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.registry.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ValidatorConfig::default();
        assert_eq!(config.input.delimiter, '|');
        assert_eq!(config.output.accepted_prefix, "accepted-");

        let options = config.split_options().unwrap();
        assert_eq!(options, SplitOptions::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = ValidatorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[registry]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("validator.toml");
        std::fs::write(
            &path,
            r#"
[input]
delimiter = ","

[output]
reasons_column = ""

[registry]
path = "/nonexistent/schemas"

[[schemas]]
name = "staged"
file_masks = ["staged_*.csv"]
columns = [
    { name = "id", type = "int" },
    { name = "birth_date", type = "date", format = "%Y-%m-%d", nullable = true },
]
"#,
        )
        .unwrap();

        let config = ValidatorConfig::load_from(path.to_str()).unwrap();
        let options = config.split_options().unwrap();
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.reasons_column, None);

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.names(), vec!["staged"]);
        assert!(registry.resolve("staged_01.csv").is_some());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let mut config = ValidatorConfig::default();
        config.input.delimiter = '§';
        assert!(matches!(
            config.split_options(),
            Err(ValidatorError::InvalidDelimiter(_))
        ));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let config = ValidatorConfig::default();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ValidatorConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.output.reason_separator, "; ");
        assert_eq!(loaded.input.file_masks, vec!["*.csv", "*.txt"]);
    }
}
