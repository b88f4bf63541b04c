//! Joint chain definitions and the analysis mode presets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    geometry::{interior_angle, normalized_distance},
    types::{
        INDEX_MCP, LandmarkFrame, MIDDLE_MCP, MIDDLE_TIP, PINKY_MCP, RING_MCP, THUMB_CMC,
        THUMB_IP, THUMB_MCP, THUMB_TIP, WRIST,
    },
};

/// What is measured at one joint of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measurement {
    /// Interior angle at `vertex` between `proximal` and `distal`.
    Angle {
        proximal: usize,
        vertex: usize,
        distal: usize,
    },
    /// `from`..`to` distance in units of the `reference` segment.
    Distance {
        from: usize,
        to: usize,
        reference: (usize, usize),
    },
}

impl Measurement {
    pub const fn angle(proximal: usize, vertex: usize, distal: usize) -> Self {
        Measurement::Angle {
            proximal,
            vertex,
            distal,
        }
    }

    /// Evaluates the measurement on one frame, `None` when undefined.
    pub fn evaluate(&self, landmarks: &LandmarkFrame) -> Option<f64> {
        match *self {
            Measurement::Angle {
                proximal,
                vertex,
                distal,
            } => interior_angle(
                landmarks.point(proximal)?,
                landmarks.point(vertex)?,
                landmarks.point(distal)?,
            ),
            Measurement::Distance {
                from,
                to,
                reference: (ref_a, ref_b),
            } => normalized_distance(
                landmarks.point(from)?,
                landmarks.point(to)?,
                landmarks.point(ref_a)?,
                landmarks.point(ref_b)?,
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    pub measurement: Measurement,
}

impl Joint {
    pub fn new(name: impl Into<String>, measurement: Measurement) -> Self {
        Self {
            name: name.into(),
            measurement,
        }
    }
}

/// How extension is derived from the largest observed angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionConvention {
    /// `180 - max`: distance still missing to a straight joint.
    Residual,
    /// `max - 180`: signed deviation past straight, negative without hyperextension.
    Signed,
}

impl ExtensionConvention {
    pub fn extension(self, max_angle: f64) -> f64 {
        match self {
            ExtensionConvention::Residual => 180.0 - max_angle,
            ExtensionConvention::Signed => max_angle - 180.0,
        }
    }
}

/// Minimum detection coverage a run needs before its angles are trusted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityThreshold {
    MinRatio(f64),
    AtLeastOne,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JointChain {
    pub name: String,
    pub joints: Vec<Joint>,
    pub extension: ExtensionConvention,
    pub threshold: QualityThreshold,
}

impl JointChain {
    pub fn new(
        name: impl Into<String>,
        joints: Vec<Joint>,
        extension: ExtensionConvention,
        threshold: QualityThreshold,
    ) -> Self {
        Self {
            name: name.into(),
            joints,
            extension,
            threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub fn mcp(self) -> usize {
        match self {
            Finger::Index => INDEX_MCP,
            Finger::Middle => MIDDLE_MCP,
            Finger::Ring => RING_MCP,
            Finger::Pinky => PINKY_MCP,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

/// Preset joint chains, one per recording protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Thumb MP and IP joints only.
    ThumbMpIp,
    /// Thumb CMC, MCP and IP joints.
    Thumb,
    Finger(Finger),
    /// Thumb tip to middle fingertip distance.
    Opposition,
}

/// Detection ratio the thumb protocols must reach.
pub const THUMB_MIN_DETECTION_RATIO: f64 = 0.6;

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 7] = [
        AnalysisMode::ThumbMpIp,
        AnalysisMode::Thumb,
        AnalysisMode::Finger(Finger::Index),
        AnalysisMode::Finger(Finger::Middle),
        AnalysisMode::Finger(Finger::Ring),
        AnalysisMode::Finger(Finger::Pinky),
        AnalysisMode::Opposition,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AnalysisMode::ThumbMpIp => "thumb-mp-ip",
            AnalysisMode::Thumb => "thumb",
            AnalysisMode::Finger(finger) => finger.label(),
            AnalysisMode::Opposition => "opposition",
        }
    }

    /// Thumb chains report residual extension behind a 0.6 detection ratio;
    /// finger chains report signed extension and only need one detected frame.
    pub fn chain(self) -> JointChain {
        match self {
            AnalysisMode::ThumbMpIp => JointChain::new(
                self.label(),
                vec![
                    Joint::new("MP", Measurement::angle(WRIST, THUMB_MCP, THUMB_IP)),
                    Joint::new("IP", Measurement::angle(THUMB_MCP, THUMB_IP, THUMB_TIP)),
                ],
                ExtensionConvention::Residual,
                QualityThreshold::MinRatio(THUMB_MIN_DETECTION_RATIO),
            ),
            AnalysisMode::Thumb => JointChain::new(
                self.label(),
                vec![
                    Joint::new("CMC", Measurement::angle(WRIST, THUMB_CMC, THUMB_MCP)),
                    Joint::new("MCP", Measurement::angle(THUMB_CMC, THUMB_MCP, THUMB_IP)),
                    Joint::new("IP", Measurement::angle(THUMB_MCP, THUMB_IP, THUMB_TIP)),
                ],
                ExtensionConvention::Residual,
                QualityThreshold::MinRatio(THUMB_MIN_DETECTION_RATIO),
            ),
            AnalysisMode::Finger(finger) => {
                let mcp = finger.mcp();
                JointChain::new(
                    self.label(),
                    vec![
                        Joint::new("MCP", Measurement::angle(WRIST, mcp, mcp + 1)),
                        Joint::new("PIP", Measurement::angle(mcp, mcp + 1, mcp + 2)),
                        Joint::new("DIP", Measurement::angle(mcp + 1, mcp + 2, mcp + 3)),
                    ],
                    ExtensionConvention::Signed,
                    QualityThreshold::AtLeastOne,
                )
            }
            AnalysisMode::Opposition => JointChain::new(
                self.label(),
                vec![Joint::new(
                    "opposition",
                    Measurement::Distance {
                        from: THUMB_TIP,
                        to: MIDDLE_TIP,
                        reference: (WRIST, THUMB_MCP),
                    },
                )],
                ExtensionConvention::Residual,
                QualityThreshold::AtLeastOne,
            ),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnalysisMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AnalysisMode::ALL
            .into_iter()
            .find(|mode| mode.label() == wanted)
            .ok_or_else(|| ConfigError::UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NUM_LANDMARKS, Point3D};

    fn straight_hand() -> LandmarkFrame {
        // Every landmark on the x axis: all joints read 180°.
        let points: Vec<Point3D> = (0..NUM_LANDMARKS)
            .map(|i| Point3D::flat(i as f64, 0.0))
            .collect();
        LandmarkFrame::from_points(&points).unwrap()
    }

    #[test]
    fn test_mode_labels_round_trip() {
        for mode in AnalysisMode::ALL {
            assert_eq!(mode.label().parse::<AnalysisMode>().unwrap(), mode);
        }
        assert!(matches!(
            "elbow".parse::<AnalysisMode>(),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_finger_chain_indices() {
        let chain = AnalysisMode::Finger(Finger::Pinky).chain();
        let triples: Vec<_> = chain.joints.iter().map(|j| j.measurement).collect();
        assert_eq!(
            triples,
            [
                Measurement::angle(0, 17, 18),
                Measurement::angle(17, 18, 19),
                Measurement::angle(18, 19, 20),
            ]
        );
        assert_eq!(chain.extension, ExtensionConvention::Signed);
        assert_eq!(chain.threshold, QualityThreshold::AtLeastOne);
    }

    #[test]
    fn test_thumb_chain_thresholds() {
        let chain = AnalysisMode::ThumbMpIp.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.joints[0].measurement, Measurement::angle(0, 2, 3));
        assert_eq!(
            chain.threshold,
            QualityThreshold::MinRatio(THUMB_MIN_DETECTION_RATIO)
        );
        assert_eq!(chain.extension, ExtensionConvention::Residual);
    }

    #[test]
    fn test_measurements_on_straight_hand() {
        let hand = straight_hand();
        for joint in AnalysisMode::Finger(Finger::Index).chain().joints {
            let angle = joint.measurement.evaluate(&hand).unwrap();
            assert!((angle - 180.0).abs() < 1e-9, "{}: {angle}", joint.name);
        }

        // |4 - 12| = 8, |0 - 2| = 2
        let opposition = &AnalysisMode::Opposition.chain().joints[0];
        let distance = opposition.measurement.evaluate(&hand).unwrap();
        assert!((distance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_landmark_is_undefined() {
        let measurement = Measurement::angle(0, 1, NUM_LANDMARKS);
        assert_eq!(measurement.evaluate(&straight_hand()), None);
    }

    #[test]
    fn test_extension_conventions() {
        assert_eq!(ExtensionConvention::Residual.extension(170.0), 10.0);
        assert_eq!(ExtensionConvention::Signed.extension(170.0), -10.0);
        assert_eq!(ExtensionConvention::Signed.extension(185.0), 5.0);
    }
}
