//! Proximity classification

use super::sensors::{Direction, ProximityReading};
use crate::error::{NavError, Result};

/// Obstacle classes acted on by the avoidance behaviour, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleClass {
    None,
    Front,
    Right,
}

/// What an absent ranger measurement means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingReadingPolicy {
    /// No measurement is treated as no obstacle.
    #[default]
    FailOpen,
    /// No measurement is treated as an obstacle.
    FailClosed,
}

/// Per-direction detection thresholds in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityThresholds {
    pub front: f64,
    pub right: f64,
    pub left: f64,
    pub up: f64,
}

impl ProximityThresholds {
    /// Same threshold in every direction.
    pub fn uniform(threshold: f64) -> Self {
        ProximityThresholds {
            front: threshold,
            right: threshold,
            left: threshold,
            up: threshold,
        }
    }

    pub fn get(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Front => self.front,
            Direction::Right => self.right,
            Direction::Left => self.left,
            Direction::Up => self.up,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for direction in [
            Direction::Front,
            Direction::Right,
            Direction::Left,
            Direction::Up,
        ] {
            let t = self.get(direction);
            if !t.is_finite() || t <= 0.0 {
                return Err(NavError::Config(format!(
                    "{:?} threshold must be positive, got {}",
                    direction, t
                )));
            }
        }
        Ok(())
    }
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        ProximityThresholds::uniform(0.25)
    }
}

/// Per-direction obstacle flags for one reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detections {
    pub front: bool,
    pub right: bool,
    pub left: bool,
    pub up: bool,
}

/// Converts raw ranger distances into obstacle signals.
#[derive(Debug, Clone)]
pub struct ProximityClassifier {
    thresholds: ProximityThresholds,
    missing: MissingReadingPolicy,
}

impl ProximityClassifier {
    pub fn new(thresholds: ProximityThresholds, missing: MissingReadingPolicy) -> Self {
        ProximityClassifier { thresholds, missing }
    }

    /// Obstacle test for a single measurement.
    ///
    /// A present reading counts iff it is strictly below `threshold`. An absent
    /// reading counts only under [`MissingReadingPolicy::FailClosed`].
    pub fn is_close(distance: Option<f64>, threshold: f64, missing: MissingReadingPolicy) -> bool {
        match distance.filter(|d| d.is_finite()) {
            Some(d) => d < threshold,
            None => missing == MissingReadingPolicy::FailClosed,
        }
    }

    pub fn detect(&self, reading: &ProximityReading) -> Detections {
        let close = |direction| {
            Self::is_close(
                reading.get(direction),
                self.thresholds.get(direction),
                self.missing,
            )
        };
        Detections {
            front: close(Direction::Front),
            right: close(Direction::Right),
            left: close(Direction::Left),
            up: close(Direction::Up),
        }
    }

    /// Pick the single class to act on this tick. FRONT dominates RIGHT.
    pub fn classify(&self, reading: &ProximityReading) -> ObstacleClass {
        let detections = self.detect(reading);
        if detections.front {
            ObstacleClass::Front
        } else if detections.right {
            ObstacleClass::Right
        } else {
            ObstacleClass::None
        }
    }

    pub fn thresholds(&self) -> &ProximityThresholds {
        &self.thresholds
    }

    pub fn missing_reading_policy(&self) -> MissingReadingPolicy {
        self.missing
    }
}

impl Default for ProximityClassifier {
    fn default() -> Self {
        ProximityClassifier::new(ProximityThresholds::default(), MissingReadingPolicy::FailOpen)
    }
}
