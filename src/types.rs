use std::{ops::Sub, time::Duration};

use serde::{Deserialize, Serialize};

pub const NUM_LANDMARKS: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const PINKY_MCP: usize = 17;

/// A decoded RGBA image captured at `timestamp` into the source media.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Duration,
}

impl Frame {
    pub fn expected_len(width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point without depth information.
    pub const fn flat(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn dot(self, other: Point3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Sub for Point3D {
    type Output = Point3D;

    fn sub(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// The 21 hand landmarks reported by the detector for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkFrame {
    points: [Point3D; NUM_LANDMARKS],
}

impl LandmarkFrame {
    pub fn new(points: [Point3D; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Builds a frame from detector output, `None` unless exactly 21 points are given.
    pub fn from_points(points: &[Point3D]) -> Option<Self> {
        let points: [Point3D; NUM_LANDMARKS] = points.try_into().ok()?;
        Some(Self { points })
    }

    pub fn point(&self, index: usize) -> Option<Point3D> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Point3D; NUM_LANDMARKS] {
        &self.points
    }
}
