use serde::Serialize;

use crate::chain::QualityThreshold;

/// Detection coverage of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QualityVerdict {
    pub total_frames: u32,
    pub detected_frames: u32,
    pub passed: bool,
}

impl QualityVerdict {
    /// Counts not yet judged against a threshold.
    pub fn pending(total_frames: u32, detected_frames: u32) -> Self {
        Self {
            total_frames,
            detected_frames,
            passed: false,
        }
    }

    /// `None` when nothing was sampled.
    pub fn detection_ratio(&self) -> Option<f64> {
        (self.total_frames > 0).then(|| self.detected_frames as f64 / self.total_frames as f64)
    }

    pub fn judged(self, threshold: QualityThreshold) -> Self {
        Self {
            passed: threshold.is_met(&self),
            ..self
        }
    }
}

/// `detected / total >= min_ratio`; an empty run never passes.
pub fn check_quality(verdict: &QualityVerdict, min_ratio: f64) -> bool {
    verdict
        .detection_ratio()
        .is_some_and(|ratio| ratio >= min_ratio)
}

impl QualityThreshold {
    pub fn is_met(&self, verdict: &QualityVerdict) -> bool {
        match *self {
            QualityThreshold::MinRatio(min_ratio) => check_quality(verdict, min_ratio),
            QualityThreshold::AtLeastOne => verdict.detected_frames > 0,
        }
    }
}
