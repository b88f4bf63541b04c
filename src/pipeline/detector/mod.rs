#[cfg(feature = "detector-ort")]
mod common;
#[cfg(feature = "detector-ort")]
mod ort;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    types::{Frame, LandmarkFrame},
};

#[cfg(feature = "detector-ort")]
pub use self::ort::OrtHandDetector;

/// Landmark detector for a single hand.
///
/// Implementations may keep internal state between calls and are driven
/// strictly one frame at a time.
pub trait HandDetector: Send {
    /// `Ok(None)` when no hand is visible in `frame`.
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<LandmarkFrame>>;
}

impl<D: HandDetector + ?Sized> HandDetector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<LandmarkFrame>> {
        (**self).detect(frame)
    }
}

impl<D: HandDetector + ?Sized> HandDetector for &mut D {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<LandmarkFrame>> {
        (**self).detect(frame)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelComplexity {
    /// int8-quantized landmark model: smaller and faster, a little less precise.
    Lite,
    /// float32 landmark model.
    Full,
}

impl ModelComplexity {
    /// File name of the landmark model this variant runs.
    pub fn model_filename(self) -> &'static str {
        match self {
            ModelComplexity::Lite => "handpose_estimation_mediapipe_2023feb_int8.onnx",
            ModelComplexity::Full => "handpose_estimation_mediapipe_2023feb.onnx",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub max_hands: u32,
    pub model_complexity: ModelComplexity,
    /// Landmark sets scored below this count as "no hand".
    pub min_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_hands: 1,
            model_complexity: ModelComplexity::Full,
            min_confidence: 0.2,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hands != 1 {
            return Err(ConfigError::UnsupportedHandCount(self.max_hands));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::OutOfUnitRange {
                name: "min_confidence",
                value: self.min_confidence as f64,
            });
        }
        Ok(())
    }
}
