//! Navigation module: drives the vehicle through the waypoint sequence
pub mod path_follower;

use self::path_follower::PathFollower;
use crate::behaviors::avoidance::AvoidanceEngine;
use crate::common::{Pose, Waypoint};
use crate::control::controllers::FlightController;
use crate::control::MotionPrimitive;
use crate::error::{NavError, Result};
use crate::perception::classifier::ObstacleClass;
use crate::perception::sensors::ProximitySensor;
use crate::perception::PerceptionStack;
use log::{debug, info};
use tokio::time::Instant;

/// How often an obstacle may be reacted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObstaclePolicy {
    /// React on every tick an obstacle is classified.
    #[default]
    EveryTick,
    /// At most one FRONT bypass per waypoint.
    OncePerWaypoint,
    /// At most one FRONT bypass for the whole mission.
    OncePerMission,
}

/// What the sequencer does once a maneuver finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterManeuver {
    /// Keep running the current waypoint's loop.
    #[default]
    ContinueWaypoint,
    /// End the current waypoint immediately.
    EndWaypoint,
}

/// Goal pursued after a FRONT bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeTarget {
    /// Head back toward the waypoint's own target.
    #[default]
    OriginalWaypoint,
    /// Treat the bypass end pose as the target for the rest of the waypoint.
    ManeuverEndPose,
}

/// Sequencer behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SequencerConfig {
    pub obstacle_policy: ObstaclePolicy,
    pub after_maneuver: AfterManeuver,
    pub resume: ResumeTarget,
    /// Horizontal distance at which a waypoint counts as reached. `None`
    /// runs each waypoint for its full duration.
    pub arrival_tolerance: Option<f64>,
}

/// Why a waypoint loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    DurationExpired,
    TargetReached,
    ManeuverCompleted,
    Aborted,
}

/// Reported to the mission controller around each maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    ManeuverStarted(ObstacleClass),
    ManeuverFinished(ObstacleClass),
}

/// Summary of one waypoint loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointReport {
    pub index: usize,
    pub exit: LoopExit,
    pub ticks: usize,
    pub maneuvers: Vec<ObstacleClass>,
    pub final_target: Pose,
}

/// Remembers handled obstacles across ticks and waypoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObstacleMemory {
    mission_handled: bool,
    waypoint_handled: bool,
}

impl ObstacleMemory {
    pub fn start_waypoint(&mut self) {
        self.waypoint_handled = false;
    }

    /// Whether `class` may trigger a maneuver under `policy`.
    pub fn permits(&self, policy: ObstaclePolicy, class: ObstacleClass) -> bool {
        if class == ObstacleClass::None {
            return false;
        }
        match policy {
            ObstaclePolicy::EveryTick => true,
            ObstaclePolicy::OncePerWaypoint => !self.waypoint_handled,
            ObstaclePolicy::OncePerMission => !self.mission_handled,
        }
    }

    /// Only a FRONT bypass counts as handling the obstacle.
    pub fn record(&mut self, class: ObstacleClass) {
        if class == ObstacleClass::Front {
            self.mission_handled = true;
            self.waypoint_handled = true;
        }
    }
}

/// Owns the ordered waypoints and walks them one loop at a time.
pub struct WaypointSequencer {
    waypoints: Vec<Waypoint>,
    cursor: usize,
    config: SequencerConfig,
    path_follower: Box<dyn PathFollower>,
    engine: AvoidanceEngine,
}

impl WaypointSequencer {
    pub fn new(
        waypoints: Vec<Waypoint>,
        config: SequencerConfig,
        path_follower: Box<dyn PathFollower>,
        engine: AvoidanceEngine,
    ) -> Self {
        WaypointSequencer {
            waypoints,
            cursor: 0,
            config,
            path_follower,
            engine,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.waypoints.len()
    }

    /// Get the name of the current path follower
    pub fn path_follower_name(&self) -> &str {
        self.path_follower.name()
    }

    /// Run the loop for the waypoint under the cursor, then advance it.
    ///
    /// Each tick takes one perception snapshot and either hands off to the
    /// avoidance engine or commands the path follower's setpoint. Abort is
    /// reported as [`LoopExit::Aborted`]; any other error is returned.
    pub async fn run_waypoint<F, S, E>(
        &mut self,
        memory: &mut ObstacleMemory,
        perception: &mut PerceptionStack<S>,
        motion: &mut MotionPrimitive<F>,
        on_event: &mut E,
    ) -> Result<WaypointReport>
    where
        F: FlightController,
        S: ProximitySensor,
        E: FnMut(SequencerEvent) -> Result<()>,
    {
        let index = self.cursor;
        let waypoint = *self.waypoints.get(index).ok_or_else(|| {
            NavError::Runtime(format!("no waypoint at index {}", index))
        })?;
        self.cursor += 1;

        info!(
            "Waypoint {}/{}: {} for {:?}",
            index + 1,
            self.waypoints.len(),
            waypoint.target,
            waypoint.duration
        );

        memory.start_waypoint();
        let mut report = WaypointReport {
            index,
            exit: LoopExit::DurationExpired,
            ticks: 0,
            maneuvers: Vec::new(),
            final_target: waypoint.target,
        };

        match self
            .waypoint_loop(&waypoint, &mut report, memory, perception, motion, on_event)
            .await
        {
            Ok(exit) => report.exit = exit,
            Err(NavError::ManualAbort) => report.exit = LoopExit::Aborted,
            Err(e) => return Err(e),
        }

        info!(
            "Waypoint {} ended: {:?} after {} ticks",
            index + 1,
            report.exit,
            report.ticks
        );
        Ok(report)
    }

    async fn waypoint_loop<F, S, E>(
        &mut self,
        waypoint: &Waypoint,
        report: &mut WaypointReport,
        memory: &mut ObstacleMemory,
        perception: &mut PerceptionStack<S>,
        motion: &mut MotionPrimitive<F>,
        on_event: &mut E,
    ) -> Result<LoopExit>
    where
        F: FlightController,
        S: ProximitySensor,
        E: FnMut(SequencerEvent) -> Result<()>,
    {
        let started = Instant::now();
        let mut target = waypoint.target;

        loop {
            if motion.is_aborted() {
                return Ok(LoopExit::Aborted);
            }
            if started.elapsed() >= waypoint.duration {
                return Ok(LoopExit::DurationExpired);
            }

            let snapshot = perception.snapshot(motion);
            report.ticks += 1;

            if let Some(tolerance) = self.config.arrival_tolerance {
                if snapshot.pose.within_horizontal_box(&target, tolerance) {
                    return Ok(LoopExit::TargetReached);
                }
            }

            if memory.permits(self.config.obstacle_policy, snapshot.class) {
                let class = snapshot.class;
                on_event(SequencerEvent::ManeuverStarted(class))?;
                let outcome = self.engine.execute(class, snapshot.pose, motion).await?;
                on_event(SequencerEvent::ManeuverFinished(class))?;

                memory.record(class);
                report.maneuvers.push(class);
                if class == ObstacleClass::Front
                    && self.config.resume == ResumeTarget::ManeuverEndPose
                {
                    target = outcome.end;
                    report.final_target = target;
                }
                if self.config.after_maneuver == AfterManeuver::EndWaypoint {
                    return Ok(LoopExit::ManeuverCompleted);
                }
                continue;
            }

            let setpoint = self.path_follower.next_setpoint(&snapshot.pose, &target);
            debug!("tick {}: {} -> {}", report.ticks, snapshot.pose, setpoint);
            motion
                .move_to(setpoint, self.path_follower.settle_time())
                .await?;
        }
    }
}
