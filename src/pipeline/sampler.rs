use anyhow::Result;

use super::source::FrameSource;
use crate::{error::PipelineError, types::Frame};

pub const DEFAULT_STEP_SECONDS: f64 = 0.5;

/// One step of the sweep; `frame` is the error when seek or capture failed.
#[derive(Debug)]
pub struct Sample {
    pub index: usize,
    pub seconds: f64,
    pub frame: Result<Frame>,
}

/// Timestamp of sample `index`, or `None` once it reaches `duration`.
pub fn sample_time(index: usize, step: f64, duration: f64) -> Option<f64> {
    let seconds = index as f64 * step;
    (seconds < duration).then_some(seconds)
}

/// Walks a frame source from 0 to its duration (exclusive) in fixed steps.
///
/// Each `next` seeks and captures before returning, so the source never runs
/// ahead of the consumer. The sweep is not restartable.
pub struct FrameSampler<S> {
    source: S,
    step: f64,
    duration: f64,
    next_index: usize,
}

impl<S: FrameSource> FrameSampler<S> {
    pub fn new(source: S, step: f64) -> Result<Self, PipelineError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(PipelineError::InvalidStep(step));
        }

        let duration = source.duration();
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            log::warn!("frame source reports unusable duration {duration}, nothing to sample");
            0.0
        };

        Ok(Self {
            source,
            step,
            duration,
            next_index: 0,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of samples the full sweep produces.
    pub fn planned_samples(&self) -> usize {
        (0..)
            .take_while(|&i| sample_time(i, self.step, self.duration).is_some())
            .count()
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn capture(&mut self, seconds: f64) -> Result<Frame> {
        self.source.seek_to(seconds)?;
        self.source.current_frame()
    }
}

impl<S: FrameSource> Iterator for FrameSampler<S> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let index = self.next_index;
        let seconds = sample_time(index, self.step, self.duration)?;
        self.next_index += 1;

        Some(Sample {
            index,
            seconds,
            frame: self.capture(seconds),
        })
    }
}

impl<S: FrameSource> std::iter::FusedIterator for FrameSampler<S> {}
