use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    DetectorConfig, HandDetector,
    common::{self, INPUT_SIZE},
};
use crate::types::{Frame, LandmarkFrame};

/// MediaPipe hand-pose estimator running on ONNX Runtime.
pub struct OrtHandDetector {
    session: Session,
    config: DetectorConfig,
}

impl OrtHandDetector {
    pub fn new(model_path: &Path, config: DetectorConfig) -> Result<Self> {
        config.validate()?;

        let expected = config.model_complexity.model_filename();
        if model_path.file_name().and_then(|name| name.to_str()) != Some(expected) {
            log::warn!(
                "{:?} complexity expects {expected}, loading {} instead",
                config.model_complexity,
                model_path.display()
            );
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!(
            "handpose ORT detector ready using {} ({:?})",
            model_path.display(),
            config.model_complexity
        );
        Ok(Self { session, config })
    }
}

impl HandDetector for OrtHandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkFrame>> {
        let (input, letterbox) = common::prepare_frame(frame, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "handpose model returned {} outputs, expected landmarks and confidence",
                outputs.len()
            ));
        }

        let confidence = outputs[1]
            .try_extract_array::<f32>()?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);
        if confidence < self.config.min_confidence {
            log::debug!("hand confidence {confidence:.3} below threshold");
            return Ok(None);
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;
        let points = common::lift_landmarks(&landmarks, &letterbox);

        LandmarkFrame::from_points(&points)
            .map(Some)
            .ok_or_else(|| anyhow!("expected 21 landmarks, got {}", points.len()))
    }
}
