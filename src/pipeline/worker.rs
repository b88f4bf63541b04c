//! Frame source and detector wrappers that bound every call with a timeout.
//!
//! The wrapped component lives on its own thread and is still driven one
//! request at a time. A request that outlives its timeout is abandoned: its
//! late reply is recognised by sequence number and discarded, and no new
//! request is queued behind it until the worker has caught up.

use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use super::{detector::HandDetector, source::FrameSource};
use crate::{
    error::PipelineError,
    types::{Frame, LandmarkFrame},
};

pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DETECT_TIMEOUT: Duration = Duration::from_secs(10);

struct StepWorker<Req, Resp> {
    step: &'static str,
    timeout: Duration,
    request_tx: Option<Sender<(u64, Req)>>,
    reply_rx: Receiver<(u64, Resp)>,
    next_seq: u64,
    outstanding: Option<u64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl<Req: Send + 'static, Resp: Send + 'static> StepWorker<Req, Resp> {
    fn spawn<T, F>(step: &'static str, timeout: Duration, mut state: T, mut handler: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(&mut T, Req) -> Resp + Send + 'static,
    {
        let (request_tx, request_rx) = unbounded::<(u64, Req)>();
        let (reply_tx, reply_rx) = unbounded();

        let handle = thread::Builder::new()
            .name(format!("{step}-worker"))
            .spawn(move || {
                for (seq, request) in request_rx.iter() {
                    let reply = handler(&mut state, request);
                    if reply_tx.send((seq, reply)).is_err() {
                        break;
                    }
                }
                log::debug!("{step} worker exiting");
            });
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                // Every call on this worker reports WorkerGone.
                log::error!("failed to spawn {step} worker: {err}");
                None
            }
        };

        Self {
            step,
            timeout,
            request_tx: handle.as_ref().map(|_| request_tx),
            reply_rx,
            next_seq: 0,
            outstanding: None,
            handle,
        }
    }

    /// One deadline covers both catching up on an abandoned request and the
    /// new request, so a call never blocks longer than `timeout`.
    fn call(&mut self, request: Req) -> Result<Resp, PipelineError> {
        let deadline = Instant::now() + self.timeout;
        if let Some(stale) = self.outstanding {
            // The reply content is dropped either way; only the wait matters.
            self.wait_for(stale, deadline)?;
            log::debug!("{} worker caught up on abandoned request #{stale}", self.step);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.request_tx
            .as_ref()
            .ok_or(PipelineError::WorkerGone { step: self.step })?
            .send((seq, request))
            .map_err(|_| PipelineError::WorkerGone { step: self.step })?;
        self.outstanding = Some(seq);

        self.wait_for(seq, deadline)
    }

    fn wait_for(&mut self, seq: u64, deadline: Instant) -> Result<Resp, PipelineError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.reply_rx.recv_timeout(remaining) {
                Ok((reply_seq, reply)) if reply_seq == seq => {
                    self.outstanding = None;
                    return Ok(reply);
                }
                Ok((reply_seq, _)) => {
                    log::debug!("{} discarding stale reply #{reply_seq}", self.step);
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(PipelineError::StepTimedOut {
                        step: self.step,
                        timeout: self.timeout,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.outstanding = None;
                    return Err(PipelineError::WorkerGone { step: self.step });
                }
            }
        }
    }
}

impl<Req, Resp> Drop for StepWorker<Req, Resp> {
    fn drop(&mut self) {
        self.request_tx.take();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.outstanding.is_none() {
            let _ = handle.join();
        } else {
            log::warn!("{} worker still busy, detaching it", self.step);
        }
    }
}

/// A [`FrameSource`] whose seek and capture run on a worker thread.
pub struct TimedSource {
    duration: f64,
    dimensions: (u32, u32),
    worker: StepWorker<f64, Result<Frame>>,
    pending: Option<Frame>,
}

impl TimedSource {
    pub fn spawn<S: FrameSource + 'static>(source: S, timeout: Duration) -> Self {
        let duration = source.duration();
        let dimensions = source.dimensions();
        let worker = StepWorker::spawn("seek", timeout, source, |source: &mut S, seconds| {
            source.seek_to(seconds)?;
            source.current_frame()
        });

        Self {
            duration,
            dimensions,
            worker,
            pending: None,
        }
    }
}

impl FrameSource for TimedSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn seek_to(&mut self, seconds: f64) -> Result<()> {
        self.pending = None;
        self.pending = Some(self.worker.call(seconds)??);
        Ok(())
    }

    fn current_frame(&mut self) -> Result<Frame> {
        Ok(self.pending.take().ok_or(PipelineError::NoFrameReady)?)
    }
}

/// A [`HandDetector`] running on a worker thread with a per-frame timeout.
pub struct TimedDetector {
    worker: StepWorker<Frame, Result<Option<LandmarkFrame>>>,
}

impl TimedDetector {
    pub fn spawn<D: HandDetector + 'static>(detector: D, timeout: Duration) -> Self {
        let worker = StepWorker::spawn("detect", timeout, detector, |detector: &mut D, frame| {
            detector.detect(&frame)
        });
        Self { worker }
    }
}

impl HandDetector for TimedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkFrame>> {
        self.worker.call(frame.clone())?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::pipeline::sampler::tests::StubSource;
    use crate::types::{NUM_LANDMARKS, Point3D};

    /// Echoes the frame timestamp in the wrist x coordinate, sleeping first
    /// for frames listed in `slow`.
    struct EchoDetector {
        slow: Vec<Duration>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl HandDetector for EchoDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkFrame>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow.contains(&frame.timestamp) {
                thread::sleep(self.delay);
            }
            let mut points = [Point3D::default(); NUM_LANDMARKS];
            points[0].x = frame.timestamp.as_secs_f64();
            Ok(Some(LandmarkFrame::new(points)))
        }
    }

    fn frame_at(seconds: f64) -> Frame {
        Frame {
            rgba: Vec::new(),
            width: 0,
            height: 0,
            timestamp: Duration::from_secs_f64(seconds),
        }
    }

    fn wrist_x(result: Result<Option<LandmarkFrame>>) -> f64 {
        result.unwrap().unwrap().point(0).unwrap().x
    }

    #[test]
    fn test_detector_round_trip() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut detector = TimedDetector::spawn(
            EchoDetector {
                slow: Vec::new(),
                delay: Duration::ZERO,
                calls: calls.clone(),
            },
            Duration::from_secs(1),
        );
        assert_eq!(wrist_x(detector.detect(&frame_at(0.5))), 0.5);
        assert_eq!(wrist_x(detector.detect(&frame_at(1.0))), 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timeout_then_stale_reply_is_discarded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut detector = TimedDetector::spawn(
            EchoDetector {
                slow: vec![Duration::ZERO],
                delay: Duration::from_millis(300),
                calls: calls.clone(),
            },
            Duration::from_millis(50),
        );

        let err = detector.detect(&frame_at(0.0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::StepTimedOut { step: "detect", .. })
        ));

        // Still busy with the abandoned frame: skipped without queueing.
        assert!(detector.detect(&frame_at(0.5)).is_err());

        thread::sleep(Duration::from_millis(400));
        assert_eq!(wrist_x(detector.detect(&frame_at(1.0))), 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_catch_up_and_new_request_share_one_timeout() {
        struct TwoSlowFrames;
        impl HandDetector for TwoSlowFrames {
            fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkFrame>> {
                // Frame 0 finishes 150ms into the next call; frame 1 never in time.
                let delay = if frame.timestamp.is_zero() { 350 } else { 1000 };
                thread::sleep(Duration::from_millis(delay));
                Ok(None)
            }
        }

        let timeout = Duration::from_millis(200);
        let mut detector = TimedDetector::spawn(TwoSlowFrames, timeout);
        assert!(detector.detect(&frame_at(0.0)).is_err());

        let started = Instant::now();
        let err = detector.detect(&frame_at(0.5)).unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::StepTimedOut { step: "detect", .. })
        ));
        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_millis(300), "call took {elapsed:?}");
    }

    #[test]
    fn test_panicking_detector_reports_worker_gone() {
        struct Broken;
        impl HandDetector for Broken {
            fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkFrame>> {
                panic!("model crashed");
            }
        }

        let mut detector = TimedDetector::spawn(Broken, Duration::from_secs(1));
        for _ in 0..2 {
            let err = detector.detect(&frame_at(0.0)).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::WorkerGone { .. })
            ));
        }
    }

    #[test]
    fn test_timed_source_captures_on_worker() {
        let source = StubSource::new(2.0);
        let seeks = source.seeks.clone();
        let mut timed = TimedSource::spawn(source, Duration::from_secs(1));
        assert_eq!(timed.duration(), 2.0);
        assert_eq!(timed.dimensions(), (2, 2));

        timed.seek_to(1.5).unwrap();
        let frame = timed.current_frame().unwrap();
        assert_eq!(frame.timestamp, Duration::from_millis(1500));
        assert!(timed.current_frame().is_err());
        assert_eq!(*seeks.lock().unwrap(), [1.5]);
    }
}
