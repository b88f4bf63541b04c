//! Finger joint range-of-motion estimation from sampled hand video frames.

pub mod chain;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geometry;
#[cfg(feature = "detector-ort")]
pub mod model_download;
pub mod pipeline;
pub mod types;

pub use chain::{AnalysisMode, JointChain};
pub use config::AnalysisConfig;
pub use diagnostics::Diagnostics;
pub use pipeline::{AnalysisOutcome, AnalysisRun, Analyzer, CancelToken};
