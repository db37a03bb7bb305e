//! Pipeline configuration, optionally loaded from YAML.
//!
//! ```yaml
//! project_root: generated_project
//! max_tool_iterations: 25
//! model: openai/gpt-oss-120b
//! temperature: 0.2
//! max_tokens: 8192
//! ```

use std::path::{Path, PathBuf};

use appgen_error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::tool_agent::DEFAULT_MAX_ITERATIONS;
use crate::tools::DEFAULT_PROJECT_ROOT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory the coder writes into
    pub project_root: PathBuf,
    /// Model turns allowed per coding step
    pub max_tool_iterations: usize,
    /// Model override; the provider's default when unset
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Cap on completion tokens per model call
    pub max_tokens: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from(DEFAULT_PROJECT_ROOT),
            max_tool_iterations: DEFAULT_MAX_ITERATIONS,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::config_invalid(format!("invalid pipeline config: {}", e))
                .with_operation("config::parse")
                .set_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_yaml_str(&yaml).map_err(|e| e.with_context("path", path.display().to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tool_iterations == 0 {
            return Err(Error::config_invalid("max_tool_iterations must be at least 1")
                .with_operation("config::validate"));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::config_invalid(format!("temperature {} is outside 0.0..=2.0", t))
                    .with_operation("config::validate"));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(Error::config_invalid("max_tokens must be at least 1").with_operation("config::validate"));
        }
        if self.project_root.as_os_str().is_empty() {
            return Err(Error::config_invalid("project_root is empty").with_operation("config::validate"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appgen_error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.project_root, PathBuf::from("generated_project"));
        assert_eq!(config.max_tool_iterations, 25);
        assert!(config.model.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config =
            PipelineConfig::from_yaml_str("model: llama-3.3-70b-versatile\nmax_tokens: 8192\n").unwrap();
        assert_eq!(config.model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(config.max_tokens, Some(8192));
        assert_eq!(config.max_tool_iterations, 25);
    }

    #[test]
    fn test_invalid_values() {
        let err = PipelineConfig::from_yaml_str("max_tool_iterations: 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = PipelineConfig::from_yaml_str("temperature: 7.5").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = PipelineConfig::from_yaml_str("max_tokens: 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = PipelineConfig::from_yaml_str("max_tool_iterations: lots").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appgen.yaml");
        std::fs::write(&path, "project_root: out\nmax_tool_iterations: 5\n").unwrap();

        let config = PipelineConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.project_root, PathBuf::from("out"));
        assert_eq!(config.max_tool_iterations, 5);

        let err = PipelineConfig::from_yaml_file(dir.path().join("missing.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }
}
