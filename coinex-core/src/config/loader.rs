//! Configuration loader supporting YAML, TOML and JSON.

use super::traits::{Configurable, Validatable};
use crate::error::ConfigError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    fn detect(path: &Path) -> Result<Self, ConfigError> {
        Self::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason: "Unrecognized file extension. Supported: .yaml, .yml, .toml, .json".to_string(),
        })
    }
}

/// Loads configuration, applies environment overrides, then validates.
///
/// # Example
///
/// ```rust,no_run
/// use coinex_core::config::{CoinExConfig, ConfigLoader};
///
/// let config: CoinExConfig = ConfigLoader::new()
///     .with_env_prefix("COINEX")
///     .load_file("coinex.yaml")?;
/// # Ok::<(), coinex_core::error::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: Option<String>,
    validate: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader that validates but applies no environment overrides.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env_prefix: None,
            validate: true,
        }
    }

    /// Sets the environment variable prefix for overrides (e.g. `COINEX`).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Sets whether to validate the configuration after loading.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Returns the environment variable prefix, if set.
    #[must_use]
    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Loads configuration from a file, detecting the format from its extension.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Configurable + Validatable,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::detect(path)?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.load_str(&content, format)
    }

    /// Builds configuration from defaults plus environment overrides only.
    pub fn load_env<T>(&self) -> Result<T, ConfigError>
    where
        T: Default + Configurable + Validatable,
    {
        self.finish(T::default())
    }

    /// Loads configuration from a string with the specified format.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Configurable + Validatable,
    {
        let config = Self::parse(content, format)?;
        self.finish(config)
    }

    /// Parses content without overrides or validation.
    pub fn parse<T>(content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let invalid = |kind: &str, e: &dyn std::fmt::Display| ConfigError::InvalidFormat {
            path: "<string>".to_string(),
            reason: format!("{kind} parse error: {e}"),
        };
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| invalid("YAML", &e)),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| invalid("TOML", &e)),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| invalid("JSON", &e)),
        }
    }

    fn finish<T>(&self, mut config: T) -> Result<T, ConfigError>
    where
        T: Configurable + Validatable,
    {
        if let Some(prefix) = &self.env_prefix {
            config.apply_env_overrides(prefix)?;
        }
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Serializes a configuration to a string in the specified format.
    pub fn serialize<T>(config: &T, format: ConfigFormat) -> Result<String, ConfigError>
    where
        T: Serialize,
    {
        let invalid = |kind: &str, e: &dyn std::fmt::Display| ConfigError::InvalidFormat {
            path: "<serialize>".to_string(),
            reason: format!("{kind} serialization error: {e}"),
        };
        match format {
            ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| invalid("YAML", &e)),
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| invalid("TOML", &e)),
            ConfigFormat::Json => {
                serde_json::to_string_pretty(config).map_err(|e| invalid("JSON", &e))
            }
        }
    }

    /// Saves a configuration to a file, detecting the format from its extension.
    pub fn save_file<T, P>(config: &T, path: P) -> Result<(), ConfigError>
    where
        T: Serialize,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = Self::serialize(config, ConfigFormat::detect(path)?)?;

        std::fs::write(path, content).map_err(|e| ConfigError::FileWriteError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestConfig {
        url: String,
        #[serde(default)]
        retries: u32,
    }

    impl Validatable for TestConfig {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.url.is_empty() {
                return Err(ConfigError::missing_field("url"));
            }
            Ok(())
        }
    }

    impl Configurable for TestConfig {
        fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
            if prefix == "FORCE" {
                self.retries = 99;
            }
            Ok(())
        }

        fn env_var_names(prefix: &str) -> Vec<String> {
            vec![format!("{prefix}_RETRIES")]
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("coinex.yml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("coinex.TOML")),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("coinex.json")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("coinex")), None);
    }

    #[test]
    fn test_load_each_format() {
        let loader = ConfigLoader::new();
        let yaml: TestConfig = loader
            .load_str("url: wss://a\nretries: 2\n", ConfigFormat::Yaml)
            .unwrap();
        let toml: TestConfig = loader
            .load_str("url = \"wss://a\"\nretries = 2\n", ConfigFormat::Toml)
            .unwrap();
        let json: TestConfig = loader
            .load_str(r#"{"url": "wss://a", "retries": 2}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(yaml, toml);
        assert_eq!(toml, json);
    }

    #[test]
    fn test_invalid_yaml_reports_parser() {
        let result: Result<TestConfig, _> =
            ConfigLoader::new().load_str("url: [oops", ConfigFormat::Yaml);
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { .. }));
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let result: Result<TestConfig, _> =
            ConfigLoader::new().load_str("url = \"\"", ConfigFormat::Toml);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));

        let skipped: TestConfig = ConfigLoader::new()
            .with_validation(false)
            .load_str("url = \"\"", ConfigFormat::Toml)
            .unwrap();
        assert!(skipped.url.is_empty());
    }

    #[test]
    fn test_env_prefix_applies_overrides() {
        let loader = ConfigLoader::new().with_env_prefix("FORCE");
        assert_eq!(loader.env_prefix(), Some("FORCE"));
        let config: TestConfig = loader.load_str("url: x", ConfigFormat::Yaml).unwrap();
        assert_eq!(config.retries, 99);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coinex.toml");
        let original = TestConfig {
            url: "wss://socket.coinex.com/v2/spot".to_string(),
            retries: 3,
        };

        ConfigLoader::save_file(&original, &path).unwrap();
        let loaded: TestConfig = ConfigLoader::new().load_file(&path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_file_not_found() {
        let result: Result<TestConfig, _> =
            ConfigLoader::new().load_file("/nonexistent/path/coinex.yaml");
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }

    #[test]
    fn test_unrecognized_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coinex.txt");
        std::fs::write(&path, "url: x").unwrap();

        let err = ConfigLoader::new()
            .load_file::<TestConfig, _>(&path)
            .unwrap_err();
        assert!(err.to_string().contains("Unrecognized file extension"));
    }
}
