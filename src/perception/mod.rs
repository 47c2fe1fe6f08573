//! Perception module: what the vehicle currently sees and where it believes it is
pub mod classifier;
pub mod localization;
pub mod sensors;

use self::classifier::{ObstacleClass, ProximityClassifier};
use self::localization::PositionTracker;
use self::sensors::{ProximityReading, ProximitySensor};
use crate::common::Pose;
use crate::control::controllers::FlightController;
use crate::control::MotionPrimitive;
use log::warn;

/// Everything a single control decision is allowed to look at.
///
/// Taken once per tick so that one decision never mixes two sensor polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub reading: ProximityReading,
    pub pose: Pose,
    pub class: ObstacleClass,
}

/// Perception stack for the vehicle
pub struct PerceptionStack<S: ProximitySensor> {
    sensor: S,
    classifier: ProximityClassifier,
    tracker: PositionTracker,
}

impl<S: ProximitySensor> PerceptionStack<S> {
    pub fn new(sensor: S, classifier: ProximityClassifier, tracker: PositionTracker) -> Self {
        PerceptionStack {
            sensor,
            classifier,
            tracker,
        }
    }

    /// Poll the rangers once. A failed poll is reported as all-absent.
    pub fn read_proximity(&mut self) -> ProximityReading {
        match self.sensor.read() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("{} read failed, treating as no data: {}", self.sensor.name(), e);
                ProximityReading::absent()
            }
        }
    }

    /// Take the per-tick snapshot: one sensor poll, one position read.
    pub fn snapshot<F: FlightController>(&mut self, motion: &mut MotionPrimitive<F>) -> Snapshot {
        let reading = self.read_proximity();
        let pose = self.tracker.get_pose(motion);
        let class = self.classifier.classify(&reading);
        Snapshot {
            reading,
            pose,
            class,
        }
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut PositionTracker {
        &mut self.tracker
    }
}
