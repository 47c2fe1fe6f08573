//! Control module: the only path by which motion reaches the vehicle
pub mod controllers;
pub mod trajectory;

use self::controllers::FlightController;
use crate::common::Pose;
use crate::error::{NavError, Result};
use crate::mission::abort::AbortSignal;
use log::debug;
use std::time::Duration;

/// Issues bounded-time position commands and paces the control loop.
///
/// Every wait goes through the abort signal, so a manual abort surfaces as
/// [`NavError::ManualAbort`] from whichever call is suspended at the time.
pub struct MotionPrimitive<F: FlightController> {
    flight: F,
    abort: AbortSignal,
    yaw: f64,
    last_commanded: Option<Pose>,
    commands_issued: usize,
}

impl<F: FlightController> MotionPrimitive<F> {
    pub fn new(flight: F, abort: AbortSignal) -> Self {
        MotionPrimitive {
            flight,
            abort,
            yaw: 0.0,
            last_commanded: None,
            commands_issued: 0,
        }
    }

    /// Yaw (degrees) sent with every position command.
    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = yaw;
        self
    }

    /// Command `target` and wait `settle` before returning.
    pub async fn move_to(&mut self, target: Pose, settle: Duration) -> Result<()> {
        self.abort.check()?;
        if !target.is_finite() {
            return Err(NavError::Runtime(format!(
                "refusing non-finite setpoint {:?}",
                target
            )));
        }

        debug!("move_to {} (settle {:?})", target, settle);
        self.flight.move_to(&target, self.yaw)?;
        self.last_commanded = Some(target);
        self.commands_issued += 1;

        self.abort.pause(settle).await
    }

    /// Wait without commanding anything.
    pub async fn hold(&mut self, duration: Duration) -> Result<()> {
        self.abort.pause(duration).await
    }

    pub fn arm(&mut self) -> Result<()> {
        self.abort.check()?;
        self.flight.arm()
    }

    pub fn takeoff(&mut self, height: f64) -> Result<()> {
        self.abort.check()?;
        self.flight.takeoff(height)
    }

    /// Landing ignores the abort signal: it is the abort path.
    pub fn land(&mut self, height: f64, duration: Duration) -> Result<()> {
        self.flight.land(height, duration)
    }

    pub fn position_estimate(&mut self) -> Result<Pose> {
        self.flight.current_position()
    }

    pub fn last_commanded(&self) -> Option<Pose> {
        self.last_commanded
    }

    pub fn commands_issued(&self) -> usize {
        self.commands_issued
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::abort::abort_channel;
    use crate::sim::{SimCommand, SimVehicle};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn move_records_command_and_settles() {
        let sim = SimVehicle::new();
        let (_handle, signal) = abort_channel();
        let mut motion = MotionPrimitive::new(sim.flight(), signal);

        let start = Instant::now();
        let target = Pose::new(1.0, 0.0, 0.4);
        motion.move_to(target, Duration::from_secs(1)).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(motion.last_commanded(), Some(target));
        assert_eq!(motion.commands_issued(), 1);
        assert_eq!(sim.commands(), vec![SimCommand::MoveTo(target)]);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_primitive_issues_nothing() {
        let sim = SimVehicle::new();
        let (handle, signal) = abort_channel();
        let mut motion = MotionPrimitive::new(sim.flight(), signal);
        handle.abort();

        let result = motion
            .move_to(Pose::new(1.0, 0.0, 0.4), Duration::from_secs(1))
            .await;
        assert_eq!(result, Err(NavError::ManualAbort));
        assert!(sim.commands().is_empty());

        // landing is still allowed once aborted
        motion.land(0.0, Duration::from_secs(2)).unwrap();
        assert_eq!(sim.commands().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_non_finite_setpoints() {
        let sim = SimVehicle::new();
        let (_handle, signal) = abort_channel();
        let mut motion = MotionPrimitive::new(sim.flight(), signal);
        let result = motion
            .move_to(Pose::new(f64::NAN, 0.0, 0.4), Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(NavError::Runtime(_))));
        assert!(sim.commands().is_empty());
    }
}
