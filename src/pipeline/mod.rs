pub mod aggregate;
pub mod analysis;
pub mod collector;
pub mod detector;
pub mod quality;
pub mod sampler;
pub mod source;
pub mod worker;

// Re-exports for convenience
pub use aggregate::{JointReading, JointResult, RangeOfMotion, RomResult, aggregate};
pub use analysis::{
    AnalysisOutcome, AnalysisRun, Analyzer, CancelToken, PipelineState, RejectReason, Rejection,
    RomReport,
};
pub use collector::{AngleSequence, FrameOutcome, LandmarkCollector, collect};
pub use detector::{DetectorConfig, HandDetector, ModelComplexity};
#[cfg(feature = "detector-ort")]
pub use detector::OrtHandDetector;
pub use quality::{QualityVerdict, check_quality};
pub use sampler::{DEFAULT_STEP_SECONDS, FrameSampler, Sample};
pub use source::{FrameSource, ImageSequenceSource};
pub use worker::{DEFAULT_DETECT_TIMEOUT, DEFAULT_SEEK_TIMEOUT, TimedDetector, TimedSource};
