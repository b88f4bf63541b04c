use serde::Serialize;

use super::collector::AngleSequence;
use crate::chain::{ExtensionConvention, JointChain, Measurement};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RangeOfMotion {
    pub flexion: f64,
    pub extension: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JointReading {
    Range(RangeOfMotion),
    Distance { minimum: f64 },
    /// No usable sample for this joint.
    InsufficientVisibility,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JointResult {
    pub joint: String,
    #[serde(flatten)]
    pub reading: JointReading,
}

/// Summary of one chain, joints in chain order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RomResult {
    pub chain: String,
    pub extension_convention: ExtensionConvention,
    pub joints: Vec<JointResult>,
}

impl RomResult {
    pub fn reading(&self, joint: &str) -> Option<&JointReading> {
        self.joints
            .iter()
            .find(|result| result.joint == joint)
            .map(|result| &result.reading)
    }

    pub fn range(&self, joint: &str) -> Option<RangeOfMotion> {
        match self.reading(joint)? {
            JointReading::Range(range) => Some(*range),
            _ => None,
        }
    }

    pub fn unmeasured(&self) -> impl Iterator<Item = &str> {
        self.joints
            .iter()
            .filter(|result| result.reading == JointReading::InsufficientVisibility)
            .map(|result| result.joint.as_str())
    }
}

fn min_max(samples: &[f64]) -> Option<(f64, f64)> {
    let (first, rest) = samples.split_first()?;
    Some(
        rest.iter()
            .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Reduces each joint's samples: `flexion = 180 - min`, extension by the
/// chain's convention from `max`; distances keep their minimum.
pub fn aggregate(sequence: &AngleSequence, chain: &JointChain) -> RomResult {
    let joints = chain
        .joints
        .iter()
        .enumerate()
        .map(|(index, joint)| {
            let reading = match (min_max(sequence.joint(index)), joint.measurement) {
                (None, _) => JointReading::InsufficientVisibility,
                (Some((min, max)), Measurement::Angle { .. }) => {
                    JointReading::Range(RangeOfMotion {
                        flexion: 180.0 - min,
                        extension: chain.extension.extension(max),
                    })
                }
                (Some((min, _)), Measurement::Distance { .. }) => {
                    JointReading::Distance { minimum: min }
                }
            };
            JointResult {
                joint: joint.name.clone(),
                reading,
            }
        })
        .collect();

    RomResult {
        chain: chain.name.clone(),
        extension_convention: chain.extension,
        joints,
    }
}
