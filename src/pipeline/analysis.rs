//! Drives one analysis run from frame source to range-of-motion report.
//!
//! Sampling and collection interleave frame by frame: the sampler captures one
//! frame, the collector hands it to the detector, and only then does the
//! sampler seek again. Per-frame faults never end a run; only missing input,
//! cancellation and the quality gate do.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Result;
use serde::Serialize;

use super::{
    aggregate::{RomResult, aggregate},
    collector::LandmarkCollector,
    detector::HandDetector,
    quality::QualityVerdict,
    sampler::FrameSampler,
    source::FrameSource,
};
use crate::{chain::JointChain, diagnostics::Diagnostics, error::ConfigError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sampling,
    Collecting,
    QualityCheck,
    Aggregating,
    Done,
    Rejected,
}

/// Shared flag that stops a run at the next frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoInput,
    InsufficientVisibility,
    Cancelled,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::NoInput => "no input",
            RejectReason::InsufficientVisibility => "insufficient hand visibility",
            RejectReason::Cancelled => "cancelled",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rejection {
    pub reason: RejectReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub total_frames: u32,
    pub detected_frames: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RomReport {
    pub result: RomResult,
    pub quality: QualityVerdict,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Done(RomReport),
    Rejected(Rejection),
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&RomReport> {
        match self {
            AnalysisOutcome::Done(report) => Some(report),
            AnalysisOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            AnalysisOutcome::Done(_) => None,
            AnalysisOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Result of one run together with its diagnostics transcript.
#[derive(Debug)]
pub struct AnalysisRun {
    pub outcome: AnalysisOutcome,
    pub state: PipelineState,
    pub diagnostics: Diagnostics,
}

/// Analyzes one joint chain; reusable across runs, holds no per-run state.
#[derive(Clone, Debug)]
pub struct Analyzer {
    chain: JointChain,
    step_seconds: f64,
    cancel: CancelToken,
}

impl Analyzer {
    pub fn new(chain: JointChain, step_seconds: f64) -> Result<Self, ConfigError> {
        if !(step_seconds.is_finite() && step_seconds > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "step_seconds",
                value: step_seconds,
            });
        }
        Ok(Self {
            chain,
            step_seconds,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn chain(&self) -> &JointChain {
        &self.chain
    }

    /// Ends a run before it starts because no usable input was given.
    pub fn reject_missing_input(&self, err: anyhow::Error) -> AnalysisRun {
        let run = self.start();
        run.reject(
            RejectReason::NoInput,
            Some(format!("{err:#}")),
            QualityVerdict::default(),
        )
    }

    fn start(&self) -> RunContext {
        let mut run = RunContext::new();
        run.diagnostics
            .info(format!("{} analysis start", self.chain.name));
        run
    }

    /// Runs the whole pipeline. `detector` is owned by this run and dropped with it.
    pub fn run<S, D>(&self, source: Result<S>, mut detector: D) -> AnalysisRun
    where
        S: FrameSource,
        D: HandDetector,
    {
        let source = match source {
            Ok(source) => source,
            Err(err) => return self.reject_missing_input(err),
        };
        let mut run = self.start();
        let (width, height) = source.dimensions();

        let mut sampler = match FrameSampler::new(source, self.step_seconds) {
            Ok(sampler) => sampler,
            Err(err) => {
                return run.reject(
                    RejectReason::NoInput,
                    Some(err.to_string()),
                    QualityVerdict::default(),
                );
            }
        };
        run.diagnostics.info(format!(
            "source ready: {:.2}s, {width}x{height}, {} frames at {:.2}s steps",
            sampler.duration(),
            sampler.planned_samples(),
            self.step_seconds
        ));

        let mut collector = LandmarkCollector::new(&self.chain);
        loop {
            if self.cancel.is_cancelled() {
                return run.reject(
                    RejectReason::Cancelled,
                    Some("cancelled before sweep finished".to_string()),
                    collector.counts(),
                );
            }

            run.enter(PipelineState::Sampling);
            let Some(sample) = sampler.next() else {
                break;
            };
            run.diagnostics
                .debug(format!("seek {:.2}s", sample.seconds));

            run.enter(PipelineState::Collecting);
            collector.observe(sample, &mut detector, &mut run.diagnostics);
        }
        drop(sampler);

        let (sequence, counts) = collector.finish();
        run.diagnostics.info(format!(
            "frames done total={} detected={}",
            counts.total_frames, counts.detected_frames
        ));

        run.enter(PipelineState::QualityCheck);
        let verdict = counts.judged(self.chain.threshold);
        if !verdict.passed {
            return run.reject(RejectReason::InsufficientVisibility, None, verdict);
        }

        run.enter(PipelineState::Aggregating);
        let result = aggregate(&sequence, &self.chain);
        for joint in result.unmeasured() {
            run.diagnostics
                .warn(format!("{joint} has no usable samples"));
        }

        run.finish(RomReport {
            result,
            quality: verdict,
        })
    }
}

struct RunContext {
    state: PipelineState,
    diagnostics: Diagnostics,
}

impl RunContext {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            diagnostics: Diagnostics::new(),
        }
    }

    fn enter(&mut self, next: PipelineState) {
        let interleaving = matches!(
            (self.state, next),
            (PipelineState::Sampling, PipelineState::Collecting)
                | (PipelineState::Collecting, PipelineState::Sampling)
        );
        if self.state != next && !interleaving {
            self.diagnostics
                .debug(format!("state {:?} -> {:?}", self.state, next));
        }
        self.state = next;
    }

    fn reject(
        mut self,
        reason: RejectReason,
        detail: Option<String>,
        verdict: QualityVerdict,
    ) -> AnalysisRun {
        self.enter(PipelineState::Rejected);
        match &detail {
            Some(detail) => self.diagnostics.warn(format!(
                "rejected: {reason} ({detail}), total={} detected={}",
                verdict.total_frames, verdict.detected_frames
            )),
            None => self.diagnostics.warn(format!(
                "rejected: {reason}, total={} detected={}",
                verdict.total_frames, verdict.detected_frames
            )),
        }

        AnalysisRun {
            outcome: AnalysisOutcome::Rejected(Rejection {
                reason,
                detail,
                total_frames: verdict.total_frames,
                detected_frames: verdict.detected_frames,
            }),
            state: self.state,
            diagnostics: self.diagnostics,
        }
    }

    fn finish(mut self, report: RomReport) -> AnalysisRun {
        self.enter(PipelineState::Done);
        self.diagnostics.info("analysis finished");
        AnalysisRun {
            outcome: AnalysisOutcome::Done(report),
            state: self.state,
            diagnostics: self.diagnostics,
        }
    }
}
