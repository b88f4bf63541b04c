use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    pipeline::{
        DEFAULT_DETECT_TIMEOUT, DEFAULT_SEEK_TIMEOUT, DEFAULT_STEP_SECONDS, DetectorConfig,
        ModelComplexity,
    },
};

pub fn default_handpose_model_path(complexity: ModelComplexity) -> PathBuf {
    PathBuf::from("models").join(complexity.model_filename())
}

/// Run settings. Every field is optional in a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub step_seconds: f64,
    pub seek_timeout_secs: f64,
    pub detect_timeout_secs: f64,
    pub detector: DetectorConfig,
    /// Overrides the model picked by `detector.model_complexity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            step_seconds: DEFAULT_STEP_SECONDS,
            seek_timeout_secs: DEFAULT_SEEK_TIMEOUT.as_secs_f64(),
            detect_timeout_secs: DEFAULT_DETECT_TIMEOUT.as_secs_f64(),
            detector: DetectorConfig::default(),
            model_path: None,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("step_seconds", self.step_seconds),
            ("seek_timeout_secs", self.seek_timeout_secs),
            ("detect_timeout_secs", self.detect_timeout_secs),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        self.detector.validate()
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| default_handpose_model_path(self.detector.model_complexity))
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.seek_timeout_secs)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.detect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hand-rom-config-{}-{name}.json",
            std::process::id()
        ));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.step_seconds, 0.5);
        assert_eq!(config.seek_timeout(), Duration::from_secs(5));
        assert_eq!(config.detect_timeout(), Duration::from_secs(10));
        assert_eq!(config.detector.model_complexity, ModelComplexity::Full);
        assert_eq!(
            config.model_path(),
            Path::new("models/handpose_estimation_mediapipe_2023feb.onnx")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_config(
            "partial",
            r#"{ "step_seconds": 0.25, "detector": { "model_complexity": "lite" } }"#,
        );
        let config = AnalysisConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.step_seconds, 0.25);
        assert_eq!(config.detector.model_complexity, ModelComplexity::Lite);
        assert_eq!(config.detector.min_confidence, 0.2);
        assert_eq!(config.detect_timeout_secs, 10.0);
        assert_eq!(
            config.model_path(),
            Path::new("models/handpose_estimation_mediapipe_2023feb_int8.onnx")
        );
    }

    #[test]
    fn test_explicit_model_path_wins_over_complexity() {
        let path = write_config(
            "explicit-model",
            r#"{ "detector": { "model_complexity": "lite" }, "model_path": "custom/hand.onnx" }"#,
        );
        let config = AnalysisConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.model_path(), Path::new("custom/hand.onnx"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let path = write_config("zero-step", r#"{ "step_seconds": 0 }"#);
        let err = AnalysisConfig::load(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(
            err,
            ConfigError::NonPositive {
                name: "step_seconds",
                ..
            }
        ));

        let path = write_config("garbled", "{ step_seconds = 1 }");
        let err = AnalysisConfig::load(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::load(Path::new("/nonexistent/hand-rom.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
