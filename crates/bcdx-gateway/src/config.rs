//! Application configuration.

use std::path::{Path, PathBuf};

use bcdx_core::constants::DEFAULT_HTTP_PORT;
use bcdx_model::artifacts::ModelFormat;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name
    pub name: String,
    /// Log level
    pub log_level: String,
    /// HTTP port for `--serve`
    pub http_port: u16,
    /// Artifact locations
    pub artifacts: ArtifactConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "bcdx".to_string(),
            log_level: "info".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            artifacts: ArtifactConfig::default(),
        }
    }
}

/// Artifact configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Fitted scaler (JSON)
    pub scaler_path: PathBuf,
    /// Trained classifier
    pub model_path: PathBuf,
    /// Classifier file format
    pub model_format: ModelFormat,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            scaler_path: PathBuf::from("artifacts/demo_scaler.json"),
            model_path: PathBuf::from("artifacts/demo_model.json"),
            model_format: ModelFormat::DenseJson,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bcdx.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[artifacts]
model_path = "models/bc.onnx"
model_format = "onnx"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.artifacts.model_format, ModelFormat::Onnx);
        assert_eq!(config.artifacts.model_path, PathBuf::from("models/bc.onnx"));
        assert_eq!(
            config.artifacts.scaler_path,
            PathBuf::from("artifacts/demo_scaler.json")
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bcdx.toml");
        let config = AppConfig {
            http_port: 9000,
            ..AppConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_documented_keys() {
        let config: AppConfig = toml::from_str(
            r#"
name = "clinic"
http_port = 9090

[artifacts]
scaler_path = "s.json"
"#,
        )
        .unwrap();
        assert_eq!(config.name, "clinic");
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.artifacts.scaler_path, PathBuf::from("s.json"));
    }

    #[test]
    fn test_invalid_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bcdx.toml");
        std::fs::write(&path, "[artifacts]\nmodel_format = \"h5\"\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
