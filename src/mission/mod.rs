//! Mission controller: takeoff, waypoints, hover, land
//!
//! The controller is the only owner of the mission phase. Everything below it
//! reports upward (an obstacle class, a failsafe trigger, a loop exit) and the
//! controller decides what phase follows. Any failsafe, manual abort or
//! unexpected error ends in a best-effort landing.
pub mod abort;

use self::abort::{abort_channel, AbortHandle};
use crate::behaviors::avoidance::AvoidanceEngine;
use crate::common::{Pose, Waypoint};
use crate::config::{MissionConfig, MAX_DURATION};
use crate::control::controllers::{FlightController, LinkMonitor};
use crate::control::MotionPrimitive;
use crate::error::{NavError, Result};
use crate::lifecycle::{MissionPhase, PhaseTracker};
use crate::navigation::{LoopExit, ObstacleMemory, SequencerEvent, WaypointReport, WaypointSequencer};
use crate::perception::sensors::{Direction, ProximitySensor};
use crate::perception::PerceptionStack;
use crate::safety::{FailsafeInputs, FailsafeKind, FailsafeSupervisor, FailsafeTrigger};
use log::{error, info, warn};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// How a mission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionOutcome {
    Completed,
    /// Ended by a failsafe or a manual abort.
    Aborted(FailsafeTrigger),
    /// Ended by an unexpected error.
    Failed {
        trigger: FailsafeTrigger,
        error: NavError,
    },
}

/// Result of the final land command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingOutcome {
    Landed,
    Failed(String),
}

/// Everything a finished mission reports.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    pub outcome: MissionOutcome,
    pub final_phase: MissionPhase,
    pub phases: Vec<MissionPhase>,
    pub waypoints: Vec<WaypointReport>,
    pub trigger: Option<FailsafeTrigger>,
    pub landing: LandingOutcome,
    pub degraded_reads: usize,
    pub elapsed: Duration,
}

impl MissionReport {
    pub fn is_success(&self) -> bool {
        self.outcome == MissionOutcome::Completed
    }

    /// Total maneuvers flown across all waypoints.
    pub fn maneuvers(&self) -> usize {
        self.waypoints.iter().map(|w| w.maneuvers.len()).sum()
    }
}

impl fmt::Display for MissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "outcome:     {:?}", self.outcome)?;
        writeln!(f, "final phase: {:?}", self.final_phase)?;
        writeln!(f, "landing:     {:?}", self.landing)?;
        writeln!(f, "mission time {:.1} s", self.elapsed.as_secs_f64())?;
        for w in &self.waypoints {
            writeln!(
                f,
                "  waypoint {}: {:?}, {} ticks, maneuvers {:?}",
                w.index + 1,
                w.exit,
                w.ticks,
                w.maneuvers
            )?;
        }
        write!(f, "degraded position reads: {}", self.degraded_reads)
    }
}

/// Mutable per-mission state, owned by the controller.
#[derive(Debug, Default)]
pub struct MissionState {
    pub memory: ObstacleMemory,
    pub started_at: Option<Instant>,
    pub reports: Vec<WaypointReport>,
}

impl MissionState {
    /// Mission time since the navigation phase began.
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

/// Top-level orchestrator of one mission.
pub struct MissionController<F: FlightController, S: ProximitySensor, L: LinkMonitor> {
    config: MissionConfig,
    phase: PhaseTracker,
    motion: MotionPrimitive<F>,
    perception: PerceptionStack<S>,
    link: L,
    supervisor: FailsafeSupervisor,
    sequencer: WaypointSequencer,
    state: MissionState,
    abort: AbortHandle,
}

impl<F, S, L> MissionController<F, S, L>
where
    F: FlightController,
    S: ProximitySensor,
    L: LinkMonitor,
{
    /// Build a controller. The configuration is validated here so a bad value
    /// never reaches the vehicle.
    pub fn new(
        config: MissionConfig,
        waypoints: Vec<Waypoint>,
        flight: F,
        sensor: S,
        link: L,
    ) -> Result<Self> {
        config.validate()?;
        if waypoints.iter().any(|w| !w.target.is_finite()) {
            return Err(NavError::Config("waypoint targets must be finite".into()));
        }
        if let Some(w) = waypoints.iter().find(|w| w.duration > MAX_DURATION) {
            return Err(NavError::Config(format!(
                "waypoint dwell of {:?} exceeds {:?}",
                w.duration, MAX_DURATION
            )));
        }

        let (abort, signal) = abort_channel();
        let motion = MotionPrimitive::new(flight, signal).with_yaw(config.yaw);
        let perception = PerceptionStack::new(sensor, config.classifier(), config.tracker());
        let sequencer = WaypointSequencer::new(
            waypoints,
            config.sequencer_config(),
            config.approach.path_follower(),
            AvoidanceEngine::new(config.maneuver),
        );

        Ok(MissionController {
            supervisor: FailsafeSupervisor::new(config.failsafe),
            config,
            phase: PhaseTracker::new("mission"),
            motion,
            perception,
            link,
            sequencer,
            state: MissionState::default(),
            abort,
        })
    }

    /// Handle for requesting a manual abort from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase.get_phase()
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    /// Fly the mission to a terminal phase. Never returns an error: every
    /// failure is folded into the report after a landing attempt.
    pub async fn run(mut self) -> MissionReport {
        info!(
            "Mission start: {} waypoints, follower {}",
            self.sequencer.waypoints().len(),
            self.sequencer.path_follower_name()
        );

        let flown = self.fly().await;
        let elapsed = self.state.elapsed();
        let stamp = |kind: FailsafeKind| FailsafeTrigger { kind, at: elapsed };

        let (mut outcome, landing) = match flown {
            Ok(None) => {
                let landing = self.land().await;
                let outcome = match &landing {
                    LandingOutcome::Landed => MissionOutcome::Completed,
                    LandingOutcome::Failed(reason) => MissionOutcome::Failed {
                        trigger: stamp(FailsafeKind::RuntimeError),
                        error: NavError::FlightController(reason.clone()),
                    },
                };
                (outcome, landing)
            }
            Ok(Some(trigger)) => (MissionOutcome::Aborted(trigger), self.land().await),
            Err(NavError::ManualAbort) => {
                warn!("Manual abort at {:?}, landing", elapsed);
                (
                    MissionOutcome::Aborted(stamp(FailsafeKind::ManualAbort)),
                    self.land().await,
                )
            }
            Err(e) => {
                error!("Mission failed: {}", e);
                let trigger = stamp(e.failsafe_kind().unwrap_or(FailsafeKind::RuntimeError));
                (
                    MissionOutcome::Failed { trigger, error: e },
                    self.land().await,
                )
            }
        };

        let terminal = match outcome {
            MissionOutcome::Completed => MissionPhase::Done,
            _ => MissionPhase::Aborted,
        };
        if let Err(e) = self.phase.set_phase(terminal) {
            error!("Could not enter {:?}: {}", terminal, e);
            outcome = MissionOutcome::Failed {
                trigger: stamp(FailsafeKind::RuntimeError),
                error: e,
            };
        }

        let trigger = match &outcome {
            MissionOutcome::Completed => None,
            MissionOutcome::Aborted(t) | MissionOutcome::Failed { trigger: t, .. } => Some(*t),
        };
        info!("Mission finished: {:?}", outcome);

        MissionReport {
            outcome,
            final_phase: self.phase.get_phase(),
            phases: self.phase.history().to_vec(),
            waypoints: self.state.reports,
            trigger,
            landing,
            degraded_reads: self.perception.tracker().degraded_reads(),
            elapsed,
        }
    }

    /// Takeoff through hover. `Ok(Some(_))` is a failsafe trigger.
    async fn fly(&mut self) -> Result<Option<FailsafeTrigger>> {
        let altitude = self.config.default_altitude;
        self.motion.arm()?;
        self.motion.hold(self.config.timing.arm_settle).await?;
        info!("Takeoff to {:.2} m", altitude);
        self.motion.takeoff(altitude)?;
        self.motion.hold(self.config.timing.takeoff_settle).await?;
        self.perception
            .tracker_mut()
            .reset(Pose::new(0.0, 0.0, altitude));

        self.phase.set_phase(MissionPhase::Navigating)?;
        self.state.started_at = Some(Instant::now());

        while !self.sequencer.is_finished() {
            if let Some(trigger) = self.check_failsafes() {
                return Ok(Some(trigger));
            }

            let phase = &mut self.phase;
            let report = self
                .sequencer
                .run_waypoint(
                    &mut self.state.memory,
                    &mut self.perception,
                    &mut self.motion,
                    &mut |event| match event {
                        SequencerEvent::ManeuverStarted(_) => phase.set_phase(MissionPhase::Avoiding),
                        SequencerEvent::ManeuverFinished(_) => {
                            phase.set_phase(MissionPhase::Navigating)
                        }
                    },
                )
                .await?;

            let aborted = report.exit == LoopExit::Aborted;
            self.state.reports.push(report);
            if aborted {
                return Err(NavError::ManualAbort);
            }

            self.motion.hold(self.config.timing.inter_waypoint).await?;
        }

        self.phase.set_phase(MissionPhase::Hovering)?;
        info!("Route complete, hovering {:?}", self.config.timing.hover);
        self.motion.hold(self.config.timing.hover).await?;
        Ok(None)
    }

    fn check_failsafes(&mut self) -> Option<FailsafeTrigger> {
        let up_range = if self.config.failsafe.altitude.is_some() {
            self.perception.read_proximity().get(Direction::Up)
        } else {
            None
        };
        let link_healthy = !self.config.failsafe.check_link || self.link.is_healthy();
        self.supervisor.check(FailsafeInputs {
            elapsed: self.state.elapsed(),
            link_healthy,
            up_range,
        })
    }

    /// Enter LANDING and command the land. A land failure is logged and
    /// reported, never raised.
    async fn land(&mut self) -> LandingOutcome {
        if let Err(e) = self.phase.set_phase(MissionPhase::Landing) {
            error!("Could not enter landing phase: {}", e);
        }

        let timing = self.config.timing;
        let landing = match self.motion.land(timing.land_height, timing.land_duration) {
            Ok(()) => LandingOutcome::Landed,
            Err(e) => {
                error!("Land command failed: {}", e);
                LandingOutcome::Failed(e.to_string())
            }
        };
        tokio::time::sleep(timing.landing_settle).await;
        landing
    }
}
