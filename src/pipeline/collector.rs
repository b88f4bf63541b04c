use super::{detector::HandDetector, quality::QualityVerdict, sampler::Sample};
use crate::{
    chain::{JointChain, Measurement},
    diagnostics::Diagnostics,
};

/// Per-joint sample collections, in chain order.
///
/// Values are always finite; sample order within a joint carries no meaning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AngleSequence {
    joints: Vec<Vec<f64>>,
}

impl AngleSequence {
    pub fn new(joint_count: usize) -> Self {
        Self {
            joints: vec![Vec::new(); joint_count],
        }
    }

    /// Appends `value` to `joint`; non-finite values and unknown joints are refused.
    pub fn push(&mut self, joint: usize, value: f64) -> bool {
        match self.joints.get_mut(joint) {
            Some(samples) if value.is_finite() => {
                samples.push(value);
                true
            }
            _ => false,
        }
    }

    pub fn joint(&self, joint: usize) -> &[f64] {
        self.joints.get(joint).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.joints.iter().map(Vec::as_slice)
    }
}

/// What happened to one sampled frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Detected,
    NoHand,
    DetectorFailed,
    SampleFailed,
}

/// Angles are kept only inside (0°, 180°]; distances only when non-negative.
fn admissible(measurement: &Measurement, value: f64) -> bool {
    match measurement {
        Measurement::Angle { .. } => value > 0.0 && value <= 180.0,
        Measurement::Distance { .. } => value >= 0.0,
    }
}

/// Feeds sampled frames through the detector and accumulates joint samples.
pub struct LandmarkCollector<'a> {
    chain: &'a JointChain,
    sequence: AngleSequence,
    total_frames: u32,
    detected_frames: u32,
}

impl<'a> LandmarkCollector<'a> {
    pub fn new(chain: &'a JointChain) -> Self {
        Self {
            chain,
            sequence: AngleSequence::new(chain.len()),
            total_frames: 0,
            detected_frames: 0,
        }
    }

    /// Processes one sample. Failures only skip the frame.
    pub fn observe<D: HandDetector + ?Sized>(
        &mut self,
        sample: Sample,
        detector: &mut D,
        diagnostics: &mut Diagnostics,
    ) -> FrameOutcome {
        self.total_frames += 1;

        let frame = match sample.frame {
            Ok(frame) => frame,
            Err(err) => {
                diagnostics.warn(format!(
                    "frame at {:.2}s unavailable, skipped: {err:#}",
                    sample.seconds
                ));
                return FrameOutcome::SampleFailed;
            }
        };

        let landmarks = match detector.detect(&frame) {
            Ok(Some(landmarks)) => landmarks,
            Ok(None) => {
                diagnostics.debug(format!("no hand detected at {:.2}s", sample.seconds));
                return FrameOutcome::NoHand;
            }
            Err(err) => {
                diagnostics.warn(format!(
                    "detection failed at {:.2}s, frame skipped: {err:#}",
                    sample.seconds
                ));
                return FrameOutcome::DetectorFailed;
            }
        };
        drop(frame);

        self.detected_frames += 1;
        for (index, joint) in self.chain.joints.iter().enumerate() {
            match joint.measurement.evaluate(&landmarks) {
                Some(value) if admissible(&joint.measurement, value) => {
                    self.sequence.push(index, value);
                }
                _ => diagnostics.debug(format!(
                    "{} undefined at {:.2}s, sample dropped",
                    joint.name, sample.seconds
                )),
            }
        }
        FrameOutcome::Detected
    }

    pub fn counts(&self) -> QualityVerdict {
        QualityVerdict::pending(self.total_frames, self.detected_frames)
    }

    pub fn finish(self) -> (AngleSequence, QualityVerdict) {
        let verdict = self.counts();
        (self.sequence, verdict)
    }
}

/// Runs every sample through the detector in order.
pub fn collect<I, D>(
    frames: I,
    chain: &JointChain,
    detector: &mut D,
    diagnostics: &mut Diagnostics,
) -> (AngleSequence, QualityVerdict)
where
    I: IntoIterator<Item = Sample>,
    D: HandDetector + ?Sized,
{
    let mut collector = LandmarkCollector::new(chain);
    for sample in frames {
        collector.observe(sample, detector, diagnostics);
    }
    collector.finish()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use anyhow::{Result, anyhow};

    use super::*;
    use crate::{
        chain::{AnalysisMode, ExtensionConvention, Joint, QualityThreshold},
        types::{Frame, LandmarkFrame, NUM_LANDMARKS, Point3D},
    };

    pub(crate) fn hand_with_angle(degrees: f64) -> LandmarkFrame {
        // Joint (0, 1, 2) at `degrees`; every other landmark at the origin.
        let mut points = [Point3D::default(); NUM_LANDMARKS];
        let rad = degrees.to_radians();
        points[0] = Point3D::new(2.0, 0.0, 0.0);
        points[1] = Point3D::new(1.0, 0.0, 0.0);
        points[2] = Point3D::new(1.0 + rad.cos(), rad.sin(), 0.0);
        LandmarkFrame::new(points)
    }

    pub(crate) fn single_joint_chain(threshold: QualityThreshold) -> JointChain {
        JointChain::new(
            "single",
            vec![Joint::new("J", Measurement::angle(0, 1, 2))],
            ExtensionConvention::Residual,
            threshold,
        )
    }

    /// Replays a fixed script of per-frame results.
    pub(crate) struct ScriptedDetector {
        pub script: Vec<Result<Option<LandmarkFrame>>>,
        pub calls: usize,
    }

    impl ScriptedDetector {
        pub(crate) fn new(script: Vec<Result<Option<LandmarkFrame>>>) -> Self {
            Self { script, calls: 0 }
        }
    }

    impl HandDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkFrame>> {
            let index = self.calls;
            self.calls += 1;
            match self.script.get_mut(index) {
                Some(Ok(result)) => Ok(result.take()),
                Some(Err(err)) => Err(anyhow!("{err}")),
                None => Ok(None),
            }
        }
    }

    fn sample(index: usize) -> Sample {
        let seconds = index as f64 * 0.5;
        Sample {
            index,
            seconds,
            frame: Ok(Frame {
                rgba: Vec::new(),
                width: 0,
                height: 0,
                timestamp: Duration::from_secs_f64(seconds),
            }),
        }
    }

    #[test]
    fn test_counts_and_samples() {
        let chain = single_joint_chain(QualityThreshold::AtLeastOne);
        let mut detector = ScriptedDetector::new(vec![
            Ok(Some(hand_with_angle(150.0))),
            Ok(None),
            Err(anyhow!("inference crashed")),
            Ok(Some(hand_with_angle(90.0))),
        ]);
        let mut diagnostics = Diagnostics::new();

        let (sequence, verdict) =
            collect((0..4).map(sample), &chain, &mut detector, &mut diagnostics);

        assert_eq!(verdict, QualityVerdict::pending(4, 2));
        let angles = sequence.joint(0);
        assert_eq!(angles.len(), 2);
        assert!((angles[0] - 150.0).abs() < 1e-9);
        assert!((angles[1] - 90.0).abs() < 1e-9);
        assert!(
            diagnostics
                .entries()
                .iter()
                .any(|e| e.level == log::Level::Warn && e.message.contains("inference crashed"))
        );
    }

    #[test]
    fn test_failed_sample_counts_without_detection() {
        let chain = single_joint_chain(QualityThreshold::AtLeastOne);
        let mut detector = ScriptedDetector::new(vec![Ok(Some(hand_with_angle(120.0)))]);
        let mut diagnostics = Diagnostics::new();
        let mut collector = LandmarkCollector::new(&chain);

        let broken = Sample {
            index: 0,
            seconds: 0.0,
            frame: Err(anyhow!("seek timed out")),
        };
        assert_eq!(
            collector.observe(broken, &mut detector, &mut diagnostics),
            FrameOutcome::SampleFailed
        );
        // The detector was never asked about the missing frame.
        assert_eq!(detector.calls, 0);
        assert_eq!(
            collector.observe(sample(1), &mut detector, &mut diagnostics),
            FrameOutcome::Detected
        );
        assert_eq!(collector.counts(), QualityVerdict::pending(2, 1));
    }

    #[test]
    fn test_degenerate_frame_counts_as_detected_but_adds_nothing() {
        let chain = AnalysisMode::Finger(crate::chain::Finger::Index).chain();
        let collapsed = LandmarkFrame::new([Point3D::default(); NUM_LANDMARKS]);
        let mut detector = ScriptedDetector::new(vec![Ok(Some(collapsed))]);
        let mut diagnostics = Diagnostics::new();

        let (sequence, verdict) = collect([sample(0)], &chain, &mut detector, &mut diagnostics);
        assert_eq!(verdict.detected_frames, 1);
        assert_eq!(sequence.joint_count(), 3);
        assert!(sequence.iter().all(<[f64]>::is_empty));
    }

    #[test]
    fn test_folded_joint_at_zero_degrees_is_dropped() {
        let chain = single_joint_chain(QualityThreshold::AtLeastOne);
        let folded = hand_with_angle(0.0);
        assert_eq!(chain.joints[0].measurement.evaluate(&folded), Some(0.0));
        let mut detector = ScriptedDetector::new(vec![Ok(Some(folded))]);
        let mut diagnostics = Diagnostics::new();

        let (sequence, verdict) = collect([sample(0)], &chain, &mut detector, &mut diagnostics);
        assert_eq!(verdict, QualityVerdict::pending(1, 1));
        assert!(sequence.joint(0).is_empty());

        // The upper bound is inclusive: a straight joint is kept.
        let mut detector = ScriptedDetector::new(vec![Ok(Some(hand_with_angle(180.0)))]);
        let (sequence, _) = collect([sample(0)], &chain, &mut detector, &mut diagnostics);
        assert_eq!(sequence.joint(0).len(), 1);
    }

    #[test]
    fn test_sequence_refuses_non_finite() {
        let mut sequence = AngleSequence::new(1);
        assert!(!sequence.push(0, f64::NAN));
        assert!(!sequence.push(1, 90.0));
        assert!(sequence.push(0, 90.0));
        assert_eq!(sequence.joint(0), [90.0]);
        assert!(sequence.joint(5).is_empty());
    }
}
