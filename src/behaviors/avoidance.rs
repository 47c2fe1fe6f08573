//! Reactive obstacle bypass maneuvers

use crate::common::Pose;
use crate::control::controllers::FlightController;
use crate::control::MotionPrimitive;
use crate::error::{NavError, Result};
use crate::perception::classifier::ObstacleClass;
use log::info;
use nalgebra::Vector3;
use std::time::Duration;

/// Lateral side a bypass swings out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    /// Unit vector pointing to this side (`y` points right).
    fn unit(self) -> Vector3<f64> {
        match self {
            Side::Left => -Vector3::y(),
            Side::Right => Vector3::y(),
        }
    }
}

/// Geometry and pacing of the bypass maneuvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverConfig {
    /// Side the FRONT bypass offsets to.
    pub bypass_side: Side,
    /// First leg: lateral offset toward `bypass_side`.
    pub lateral_offset: f64,
    /// Second leg: forward advance along the offset line.
    pub forward_advance: f64,
    /// Third leg: lateral move back away from `bypass_side`.
    pub return_offset: f64,
    /// Lateral nudge away from a RIGHT obstacle.
    pub sidestep: f64,
    /// Wait after each maneuver command.
    pub settle: Duration,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        ManeuverConfig {
            bypass_side: Side::Left,
            lateral_offset: 0.5,
            forward_advance: 0.5,
            return_offset: 0.5,
            sidestep: 0.5,
            settle: Duration::from_secs(1),
        }
    }
}

impl ManeuverConfig {
    pub fn validate(&self) -> Result<()> {
        let legs = [
            ("lateral_offset", self.lateral_offset),
            ("forward_advance", self.forward_advance),
            ("return_offset", self.return_offset),
            ("sidestep", self.sidestep),
        ];
        for (name, value) in legs {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::Config(format!(
                    "{} must be a non-negative distance, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Progress through a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverState {
    Idle,
    Step1,
    Step2,
    Step3,
    Done,
}

impl ManeuverState {
    fn after(self, steps: usize) -> ManeuverState {
        match (self, steps) {
            (ManeuverState::Idle, _) => ManeuverState::Step1,
            (ManeuverState::Step1, 1) => ManeuverState::Done,
            (ManeuverState::Step1, _) => ManeuverState::Step2,
            (ManeuverState::Step2, _) => ManeuverState::Step3,
            (ManeuverState::Step3, _) | (ManeuverState::Done, _) => ManeuverState::Done,
        }
    }
}

/// Result of a completed maneuver.
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverOutcome {
    pub class: ObstacleClass,
    pub waypoints: Vec<Pose>,
    pub end: Pose,
}

/// Executes fixed bypass trajectories.
///
/// A maneuver is atomic with respect to the sequencer: once started it runs
/// every step in order, and only an abort or a flight controller failure
/// stops it early.
#[derive(Debug, Clone)]
pub struct AvoidanceEngine {
    config: ManeuverConfig,
    state: ManeuverState,
    completed: usize,
}

impl AvoidanceEngine {
    pub fn new(config: ManeuverConfig) -> Self {
        AvoidanceEngine {
            config,
            state: ManeuverState::Idle,
            completed: 0,
        }
    }

    pub fn config(&self) -> &ManeuverConfig {
        &self.config
    }

    pub fn state(&self) -> ManeuverState {
        self.state
    }

    /// Number of maneuvers run to completion.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// The absolute setpoints a maneuver for `class` starting at `origin` visits.
    ///
    /// FRONT: offset, advance, return. RIGHT: a single sidestep to the left.
    pub fn plan(&self, class: ObstacleClass, origin: Pose) -> Vec<Pose> {
        let c = &self.config;
        match class {
            ObstacleClass::None => Vec::new(),
            ObstacleClass::Front => {
                let side = c.bypass_side.unit();
                let offset = origin.offset(side * c.lateral_offset);
                let advanced = offset.offset(Vector3::x() * c.forward_advance);
                let returned = advanced.offset(-side * c.return_offset);
                vec![offset, advanced, returned]
            }
            ObstacleClass::Right => vec![origin.offset(Side::Left.unit() * c.sidestep)],
        }
    }

    /// Run the maneuver for `class` from `origin` to completion.
    pub async fn execute<F: FlightController>(
        &mut self,
        class: ObstacleClass,
        origin: Pose,
        motion: &mut MotionPrimitive<F>,
    ) -> Result<ManeuverOutcome> {
        let waypoints = self.plan(class, origin);
        if waypoints.is_empty() {
            return Ok(ManeuverOutcome {
                class,
                waypoints,
                end: origin,
            });
        }

        info!("{:?} obstacle: starting {}-step maneuver from {}", class, waypoints.len(), origin);
        self.state = ManeuverState::Idle;
        for setpoint in &waypoints {
            self.state = self.state.after(waypoints.len());
            if let Err(e) = motion.move_to(*setpoint, self.config.settle).await {
                self.state = ManeuverState::Idle;
                return Err(e);
            }
        }
        self.state = ManeuverState::Done;
        self.completed += 1;

        let end = waypoints[waypoints.len() - 1];
        info!("{:?} maneuver complete at {}", class, end);
        self.state = ManeuverState::Idle;

        Ok(ManeuverOutcome {
            class,
            waypoints,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::abort::abort_channel;
    use crate::sim::SimVehicle;
    use approx::assert_relative_eq;
    use tokio::time::Instant;

    #[test]
    fn front_plan_is_offset_advance_return() {
        let engine = AvoidanceEngine::new(ManeuverConfig {
            forward_advance: 0.8,
            ..ManeuverConfig::default()
        });
        let plan = engine.plan(ObstacleClass::Front, Pose::new(0.2, 0.0, 0.4));
        assert_eq!(plan.len(), 3);
        assert_relative_eq!(plan[0].y(), -0.5);
        assert_relative_eq!(plan[0].x(), 0.2);
        assert_relative_eq!(plan[1].x(), 1.0);
        assert_relative_eq!(plan[1].y(), -0.5);
        assert_relative_eq!(plan[2].x(), 1.0);
        assert_relative_eq!(plan[2].y(), 0.0);
        assert!(plan.iter().all(|p| p.z() == 0.4));
    }

    #[test]
    fn asymmetric_bypass_to_the_right() {
        let engine = AvoidanceEngine::new(ManeuverConfig {
            bypass_side: Side::Right,
            forward_advance: 0.8,
            return_offset: 0.8,
            ..ManeuverConfig::default()
        });
        let plan = engine.plan(ObstacleClass::Front, Pose::new(0.0, 0.0, 0.4));
        assert_relative_eq!(plan[0].y(), 0.5);
        assert_relative_eq!(plan[2].y(), -0.3);
    }

    #[test]
    fn right_plan_is_single_left_sidestep() {
        let engine = AvoidanceEngine::new(ManeuverConfig::default());
        let plan = engine.plan(ObstacleClass::Right, Pose::new(1.0, -0.4, 0.4));
        assert_eq!(plan, vec![Pose::new(1.0, -0.9, 0.4)]);
        assert!(engine.plan(ObstacleClass::None, Pose::new(0.0, 0.0, 0.4)).is_empty());
    }

    #[test]
    fn state_machine_walks_every_step() {
        let mut s = ManeuverState::Idle;
        let mut seen = Vec::new();
        for _ in 0..3 {
            s = s.after(3);
            seen.push(s);
        }
        assert_eq!(
            seen,
            vec![ManeuverState::Step1, ManeuverState::Step2, ManeuverState::Step3]
        );
        assert_eq!(ManeuverState::Step1.after(1), ManeuverState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn front_maneuver_issues_three_settled_commands() {
        let sim = SimVehicle::new();
        let (_h, signal) = abort_channel();
        let mut motion = MotionPrimitive::new(sim.flight(), signal);
        let mut engine = AvoidanceEngine::new(ManeuverConfig::default());

        let start = Instant::now();
        let origin = Pose::new(0.0, 0.0, 0.4);
        let outcome = engine
            .execute(ObstacleClass::Front, origin, &mut motion)
            .await
            .unwrap();

        assert_eq!(sim.move_commands(), outcome.waypoints);
        assert_eq!(sim.move_commands().len(), 3);
        assert_eq!(outcome.end, Pose::new(0.5, 0.0, 0.4));
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(engine.completed(), 1);
        assert_eq!(engine.state(), ManeuverState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn right_maneuver_issues_one_command() {
        let sim = SimVehicle::new();
        let (_h, signal) = abort_channel();
        let mut motion = MotionPrimitive::new(sim.flight(), signal);
        let mut engine = AvoidanceEngine::new(ManeuverConfig::default());

        engine
            .execute(ObstacleClass::Right, Pose::new(0.0, 0.0, 0.4), &mut motion)
            .await
            .unwrap();
        assert_eq!(sim.move_commands(), vec![Pose::new(0.0, -0.5, 0.4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_maneuver_mid_way() {
        let sim = SimVehicle::new();
        let (handle, signal) = abort_channel();
        let mut motion = MotionPrimitive::new(sim.flight(), signal);
        let mut engine = AvoidanceEngine::new(ManeuverConfig::default());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            handle.abort();
        });
        let result = engine
            .execute(ObstacleClass::Front, Pose::new(0.0, 0.0, 0.4), &mut motion)
            .await;
        assert_eq!(result, Err(NavError::ManualAbort));
        assert_eq!(sim.move_commands().len(), 2);
        assert_eq!(engine.completed(), 0);
    }
}
