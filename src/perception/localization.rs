//! Position tracking

use crate::common::Pose;
use crate::control::controllers::FlightController;
use crate::control::MotionPrimitive;
use log::warn;

/// Where the tracker's belief comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerMode {
    /// Use the flight controller's position estimate.
    #[default]
    External,
    /// Integrate the last commanded setpoint.
    DeadReckoning,
}

/// Maintains the controller's belief of the current position.
///
/// Reads never fail. When no estimate is available the tracker falls back to
/// the last known pose, or the origin at the default altitude before any
/// pose is known, and counts the read as degraded.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    mode: TrackerMode,
    default_altitude: f64,
    last_known: Option<Pose>,
    degraded_reads: usize,
}

impl PositionTracker {
    pub fn new(mode: TrackerMode, default_altitude: f64) -> Self {
        PositionTracker {
            mode,
            default_altitude,
            last_known: None,
            degraded_reads: 0,
        }
    }

    /// Get the current pose estimate
    pub fn get_pose<F: FlightController>(&mut self, motion: &mut MotionPrimitive<F>) -> Pose {
        let estimate = match self.mode {
            TrackerMode::External => match motion.position_estimate() {
                Ok(pose) if pose.is_finite() => Some(pose),
                Ok(pose) => {
                    warn!("Discarding non-finite position estimate {:?}", pose);
                    None
                }
                Err(e) => {
                    warn!("Position estimate unavailable: {}", e);
                    None
                }
            },
            TrackerMode::DeadReckoning => motion.last_commanded(),
        };

        match estimate {
            Some(pose) => {
                self.last_known = Some(pose);
                pose
            }
            None => {
                self.degraded_reads += 1;
                let fallback = self.fallback();
                warn!("Position confidence degraded, using {}", fallback);
                fallback
            }
        }
    }

    /// Seed the belief, e.g. with the takeoff pose.
    pub fn reset(&mut self, pose: Pose) {
        if pose.is_finite() {
            self.last_known = Some(pose);
        }
    }

    pub fn degraded_reads(&self) -> usize {
        self.degraded_reads
    }

    fn fallback(&self) -> Pose {
        self.last_known
            .unwrap_or_else(|| Pose::new(0.0, 0.0, self.default_altitude))
    }
}
