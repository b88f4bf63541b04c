//! Joint geometry on 3D landmark positions.

use crate::types::Point3D;

/// Interior angle in degrees at vertex `b` formed by `a` and `c`.
///
/// Uses `cos(θ) = (ab · cb) / (|ab| × |cb|)` with depth included. Returns
/// `None` when either arm has zero length, i.e. the angle is undefined for
/// this frame and the sample must be dropped.
pub fn interior_angle(a: Point3D, b: Point3D, c: Point3D) -> Option<f64> {
    let ab = a - b;
    let cb = c - b;

    let ratio = ab.dot(cb) / (ab.norm() * cb.norm());
    if !ratio.is_finite() {
        return None;
    }

    // Rounding can push collinear input just past ±1.
    Some(ratio.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Distance between `p` and `q` in units of the `ref_a`..`ref_b` segment.
pub fn normalized_distance(p: Point3D, q: Point3D, ref_a: Point3D, ref_b: Point3D) -> Option<f64> {
    let ratio = (p - q).norm() / (ref_a - ref_b).norm();
    ratio.is_finite().then_some(ratio)
}
