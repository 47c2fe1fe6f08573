//! Interfaces to the external flight controller and radio link

use crate::common::Pose;
use crate::error::Result;
use std::time::Duration;

/// The vehicle's low level position controller.
///
/// Commands return once they have been accepted; the caller is responsible
/// for waiting out the settle time.
pub trait FlightController: Send {
    /// Ask the vehicle to arm its motors.
    fn arm(&mut self) -> Result<()>;

    /// Climb to `height` above the takeoff point.
    fn takeoff(&mut self, height: f64) -> Result<()>;

    /// Command an absolute position and yaw (degrees).
    fn move_to(&mut self, target: &Pose, yaw: f64) -> Result<()>;

    /// Descend to `height` over `duration`.
    fn land(&mut self, height: f64, duration: Duration) -> Result<()>;

    /// Current position estimate, if the controller exposes one.
    fn current_position(&mut self) -> Result<Pose>;
}

/// Health of the communication link to the vehicle.
pub trait LinkMonitor: Send {
    fn is_healthy(&mut self) -> bool;
}
