//! Common types shared across the navigation core

use nalgebra::Vector3;
use std::fmt;
use std::time::Duration;

/// A position in the local frame, in meters.
///
/// `x` points forward, `y` points right and `z` points up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    position: Vector3<f64>,
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Pose {
            position: Vector3::new(x, y, z),
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// Translate by a relative offset.
    pub fn offset(&self, delta: Vector3<f64>) -> Pose {
        Pose {
            position: self.position + delta,
        }
    }

    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.position - self.position).norm()
    }

    /// Distance in the horizontal plane, ignoring altitude.
    pub fn horizontal_distance_to(&self, other: &Pose) -> f64 {
        let delta = other.position - self.position;
        delta.x.hypot(delta.y)
    }

    /// True when both horizontal axes are within `tolerance` of `other`.
    pub fn within_horizontal_box(&self, other: &Pose, tolerance: f64) -> bool {
        let delta = other.position - self.position;
        delta.x.abs() <= tolerance && delta.y.abs() <= tolerance
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x(), self.y(), self.z())
    }
}

/// A target pose held for a dwell duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub target: Pose,
    pub duration: Duration,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64, duration: Duration) -> Self {
        Waypoint {
            target: Pose::new(x, y, z),
            duration,
        }
    }

    /// Build from the `(x, y, z, seconds)` tuples mission files are written in.
    ///
    /// Negative or NaN durations collapse to zero, durations too large to
    /// represent saturate.
    pub fn from_tuple((x, y, z, secs): (f64, f64, f64, f64)) -> Self {
        let duration = match Duration::try_from_secs_f64(secs) {
            Ok(d) => d,
            Err(_) if secs > 0.0 => Duration::MAX,
            Err(_) => Duration::ZERO,
        };
        Waypoint::new(x, y, z, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn horizontal_distance_ignores_altitude() {
        let a = Pose::new(0.0, 0.0, 0.4);
        let b = Pose::new(3.0, 4.0, 2.0);
        assert_relative_eq!(a.horizontal_distance_to(&b), 5.0);
        assert!(a.distance_to(&b) > 5.0);
    }

    #[test]
    fn non_finite_pose_is_detected() {
        assert!(Pose::new(0.0, 1.0, 0.4).is_finite());
        assert!(!Pose::new(f64::NAN, 1.0, 0.4).is_finite());
    }

    #[test]
    fn negative_dwell_collapses_to_zero() {
        let wp = Waypoint::from_tuple((1.0, 0.0, 0.4, -2.0));
        assert_eq!(wp.duration, Duration::ZERO);
        let wp = Waypoint::from_tuple((1.0, 0.0, 0.4, 3.0));
        assert_eq!(wp.duration, Duration::from_secs(3));
        let wp = Waypoint::from_tuple((1.0, 0.0, 0.4, f64::NAN));
        assert_eq!(wp.duration, Duration::ZERO);
    }

    #[test]
    fn oversized_dwell_saturates() {
        let wp = Waypoint::from_tuple((0.0, 0.0, 0.4, 1e20));
        assert_eq!(wp.duration, Duration::MAX);
        let wp = Waypoint::from_tuple((0.0, 0.0, 0.4, f64::INFINITY));
        assert_eq!(wp.duration, Duration::MAX);
    }

    #[test]
    fn horizontal_box_checks_each_axis() {
        let target = Pose::new(1.0, 0.0, 0.4);
        // diagonal offset outside a 0.05 circle but inside the box
        assert!(Pose::new(0.96, 0.04, 0.4).within_horizontal_box(&target, 0.05));
        assert!(Pose::new(1.0, 0.0, 2.0).within_horizontal_box(&target, 0.05));
        assert!(!Pose::new(0.94, 0.0, 0.4).within_horizontal_box(&target, 0.05));
        assert!(!Pose::new(1.0, -0.06, 0.4).within_horizontal_box(&target, 0.05));
    }
}
