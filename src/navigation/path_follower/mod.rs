//! Path following strategies toward the active waypoint

use crate::common::Pose;
use std::fmt::Debug;
use std::time::Duration;

/// Trait for goal-seeking strategies used on clear ticks
pub trait PathFollower: Debug + Send + Sync {
    /// Create a new instance with default parameters
    fn new() -> Self
    where
        Self: Sized;

    /// Setpoint to command this tick, given the tracked pose and the goal.
    fn next_setpoint(&self, current: &Pose, goal: &Pose) -> Pose;

    /// How long to wait after commanding the setpoint.
    fn settle_time(&self) -> Duration;

    /// Get the name of this path follower
    fn name(&self) -> &str;
}

pub mod simple;
pub mod stepped;

// Default implementation
pub use simple::SimplePathFollower;
pub use simple::SimplePathFollower as DefaultPathFollower;
pub use stepped::SteppedPathFollower;
