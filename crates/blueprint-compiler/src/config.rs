//! Compiler configuration and loading.

use std::path::Path;

use blueprint_compose::ComposeOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_VERSION: &str = "blueprint/v1";
const KIND: &str = "CompilerConfig";

/// Errors that can occur when loading or validating a compiler config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'blueprint/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'CompilerConfig', got '{0}'")]
    InvalidKind(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    /// A numeric setting outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How a compilation runs and what it emits.
///
/// ```yaml
/// apiVersion: blueprint/v1
/// kind: CompilerConfig
/// metadata:
///   name: shop
/// resolver:
///   maxErrors: 50
/// composer:
///   defaultPageSize: 25
/// output:
///   format: messagepack
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub composer: ComposerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Machine identifier of the project (lowercase, no spaces).
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Cap on the diagnostics reported for one failed compilation.
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_errors: default_max_errors(),
        }
    }
}

fn default_max_errors() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Endpoints without a response block answer with every field of the
    /// target model.
    #[serde(default = "default_true")]
    pub emit_default_response: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            emit_default_response: true,
        }
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    MessagePack,
    None,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new("blueprint")
    }
}

impl CompilerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ConfigMetadata {
                name: name.into(),
                description: None,
            },
            resolver: ResolverConfig::default(),
            composer: ComposerConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Load a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a config from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: CompilerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(ConfigError::InvalidKind(self.kind.clone()));
        }
        if self.metadata.name.is_empty() {
            return Err(ConfigError::MissingField("metadata.name".to_string()));
        }
        if self.resolver.max_errors == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resolver.maxErrors".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.composer.default_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "composer.defaultPageSize".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            default_page_size: self.composer.default_page_size,
            emit_default_response: self.composer.emit_default_response,
        }
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.resolver.max_errors = max_errors;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.composer.default_page_size = page_size;
        self
    }

    pub fn with_output(mut self, format: OutputFormat) -> Self {
        self.output.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
apiVersion: blueprint/v1
kind: CompilerConfig

metadata:
  name: shop
  description: "Shop backend"

resolver:
  maxErrors: 10

composer:
  defaultPageSize: 50
  emitDefaultResponse: false

output:
  format: none
"#;
        let config = CompilerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.metadata.name, "shop");
        assert_eq!(config.metadata.description.as_deref(), Some("Shop backend"));
        assert_eq!(config.resolver.max_errors, 10);
        assert_eq!(config.output.format, OutputFormat::None);

        let options = config.compose_options();
        assert_eq!(options.default_page_size, 50);
        assert!(!options.emit_default_response);
    }

    #[test]
    fn test_config_defaults() {
        let config = CompilerConfig::from_yaml("metadata:\n  name: minimal\n").unwrap();
        assert_eq!(config, CompilerConfig::new("minimal"));
        assert_eq!(config.resolver.max_errors, 100);
        assert_eq!(config.composer.default_page_size, 20);
        assert!(config.composer.emit_default_response);
        assert_eq!(config.output.format, OutputFormat::MessagePack);
    }

    #[test]
    fn test_config_envelope_is_checked() {
        let err = CompilerConfig::from_yaml("apiVersion: blueprint/v2\nmetadata:\n  name: x\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiVersion(v) if v == "blueprint/v2"));

        let err = CompilerConfig::from_yaml("kind: Scenario\nmetadata:\n  name: x\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKind(_)));

        let err = CompilerConfig::from_yaml("kind: CompilerConfig\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(field) if field == "metadata.name"));

        let err = CompilerConfig::from_yaml("metadata:\n  name: x\nresolver:\n  maxErrors: 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = CompilerConfig::new("from_file").with_page_size(5).to_yaml().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = CompilerConfig::load(file.path()).unwrap();
        assert_eq!(config.metadata.name, "from_file");
        assert_eq!(config.composer.default_page_size, 5);
    }

    #[test]
    fn test_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CompilerConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
