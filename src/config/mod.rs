//! Mission configuration and the named mission profiles

use crate::behaviors::avoidance::{ManeuverConfig, Side};
use crate::common::Waypoint;
use crate::error::{NavError, Result};
use crate::navigation::path_follower::{PathFollower, SimplePathFollower, SteppedPathFollower};
use crate::navigation::{AfterManeuver, ObstaclePolicy, ResumeTarget, SequencerConfig};
use crate::perception::classifier::{
    MissingReadingPolicy, ProximityClassifier, ProximityThresholds,
};
use crate::perception::localization::{PositionTracker, TrackerMode};
use crate::safety::{AltitudeBounds, FailsafeConfig};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for every configured pause, settle and limit.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// How clear ticks approach the waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApproachMode {
    /// Command the waypoint itself every tick.
    Direct { settle: Duration },
    /// Fixed-size steps from the tracked position.
    Stepped { step: f64, settle: Duration },
}

impl ApproachMode {
    pub fn settle(&self) -> Duration {
        match *self {
            ApproachMode::Direct { settle } | ApproachMode::Stepped { settle, .. } => settle,
        }
    }

    /// Build the path follower for this mode.
    pub fn path_follower(&self) -> Box<dyn PathFollower> {
        match *self {
            ApproachMode::Direct { settle } => Box::new(SimplePathFollower::with_settle(settle)),
            ApproachMode::Stepped { step, settle } => {
                Box::new(SteppedPathFollower::with_step(step, settle))
            }
        }
    }
}

/// Fixed pauses around the waypoint sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionTiming {
    /// Wait between the arming request and takeoff.
    pub arm_settle: Duration,
    pub takeoff_settle: Duration,
    pub inter_waypoint: Duration,
    pub hover: Duration,
    pub land_height: f64,
    pub land_duration: Duration,
    pub landing_settle: Duration,
}

impl Default for MissionTiming {
    fn default() -> Self {
        MissionTiming {
            arm_settle: Duration::from_secs(1),
            takeoff_settle: Duration::from_secs(3),
            inter_waypoint: Duration::from_millis(500),
            hover: Duration::from_secs(5),
            land_height: 0.0,
            land_duration: Duration::from_secs(2),
            landing_settle: Duration::from_secs(3),
        }
    }
}

/// Every tunable of a mission.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionConfig {
    pub thresholds: ProximityThresholds,
    pub missing_reading: MissingReadingPolicy,
    pub approach: ApproachMode,
    pub maneuver: ManeuverConfig,
    pub obstacle_policy: ObstaclePolicy,
    pub after_maneuver: AfterManeuver,
    pub resume: ResumeTarget,
    pub arrival_tolerance: Option<f64>,
    pub tracker_mode: TrackerMode,
    /// Takeoff height and fallback altitude for the position tracker.
    pub default_altitude: f64,
    pub yaw: f64,
    pub failsafe: FailsafeConfig,
    pub timing: MissionTiming,
}

impl Default for MissionConfig {
    fn default() -> Self {
        MissionConfig {
            thresholds: ProximityThresholds::default(),
            missing_reading: MissingReadingPolicy::FailOpen,
            approach: ApproachMode::Direct {
                settle: Duration::from_millis(100),
            },
            maneuver: ManeuverConfig::default(),
            obstacle_policy: ObstaclePolicy::EveryTick,
            after_maneuver: AfterManeuver::ContinueWaypoint,
            resume: ResumeTarget::OriginalWaypoint,
            arrival_tolerance: None,
            tracker_mode: TrackerMode::External,
            default_altitude: 0.4,
            yaw: 0.0,
            failsafe: FailsafeConfig::default(),
            timing: MissionTiming::default(),
        }
    }
}

fn distance_param(params: &HashMap<String, f64>, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        None => Ok(None),
        Some(&value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        Some(&value) => Err(NavError::Config(format!(
            "{} must be a non-negative distance, got {}",
            key, value
        ))),
    }
}

fn seconds_param(params: &HashMap<String, f64>, key: &str) -> Result<Option<Duration>> {
    match params.get(key) {
        None => Ok(None),
        Some(&secs) => match Duration::try_from_secs_f64(secs) {
            Ok(d) if d <= MAX_DURATION => Ok(Some(d)),
            _ => Err(NavError::Config(format!(
                "{} must be between 0 and {} seconds, got {}",
                key,
                MAX_DURATION.as_secs(),
                secs
            ))),
        },
    }
}

impl MissionConfig {
    /// Apply named numeric overrides. Unknown keys are ignored.
    ///
    /// Zero disables `mission_timeout`, `altitude_ceiling`, `altitude_floor`
    /// and `arrival_tolerance`. Setting `step_size` switches to the stepped
    /// approach. The configuration is left untouched if any value is rejected.
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        let mut next = self.clone();
        next.apply(params)?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn apply(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(t) = distance_param(params, "threshold")? {
            self.thresholds = ProximityThresholds::uniform(t);
        }
        for (key, slot) in [
            ("front_threshold", &mut self.thresholds.front),
            ("right_threshold", &mut self.thresholds.right),
            ("left_threshold", &mut self.thresholds.left),
            ("up_threshold", &mut self.thresholds.up),
        ] {
            if let Some(t) = distance_param(params, key)? {
                *slot = t;
            }
        }

        let mut settle = self.approach.settle();
        if let Some(s) = seconds_param(params, "approach_settle")? {
            settle = s;
        }
        self.approach = match (self.approach, distance_param(params, "step_size")?) {
            (_, Some(step)) | (ApproachMode::Stepped { step, .. }, None) => {
                ApproachMode::Stepped { step, settle }
            }
            (ApproachMode::Direct { .. }, None) => ApproachMode::Direct { settle },
        };

        for (key, slot) in [
            ("lateral_offset", &mut self.maneuver.lateral_offset),
            ("forward_advance", &mut self.maneuver.forward_advance),
            ("return_offset", &mut self.maneuver.return_offset),
            ("sidestep", &mut self.maneuver.sidestep),
        ] {
            if let Some(d) = distance_param(params, key)? {
                *slot = d;
            }
        }
        if let Some(s) = seconds_param(params, "maneuver_settle")? {
            self.maneuver.settle = s;
        }

        if let Some(tol) = distance_param(params, "arrival_tolerance")? {
            self.arrival_tolerance = (tol > 0.0).then_some(tol);
        }
        if let Some(alt) = distance_param(params, "default_altitude")? {
            self.default_altitude = alt;
        }
        if let Some(&yaw) = params.get("yaw") {
            self.yaw = yaw;
        }

        if let Some(limit) = seconds_param(params, "mission_timeout")? {
            self.failsafe.mission_timeout = (!limit.is_zero()).then_some(limit);
        }
        if let Some(ceiling) = distance_param(params, "altitude_ceiling")? {
            self.failsafe.altitude = (ceiling > 0.0).then(|| AltitudeBounds {
                ceiling,
                floor: self.failsafe.altitude.and_then(|b| b.floor),
            });
        }
        if let Some(floor) = distance_param(params, "altitude_floor")? {
            let bounds = self.failsafe.altitude.ok_or_else(|| {
                NavError::Config("altitude_floor needs an altitude ceiling".into())
            })?;
            self.failsafe.altitude = Some(AltitudeBounds {
                floor: (floor > 0.0).then_some(floor),
                ..bounds
            });
        }

        let timing = &mut self.timing;
        for (key, slot) in [
            ("arm_settle", &mut timing.arm_settle),
            ("takeoff_settle", &mut timing.takeoff_settle),
            ("inter_waypoint_pause", &mut timing.inter_waypoint),
            ("hover_time", &mut timing.hover),
            ("land_duration", &mut timing.land_duration),
            ("landing_settle", &mut timing.landing_settle),
        ] {
            if let Some(d) = seconds_param(params, key)? {
                *slot = d;
            }
        }
        if let Some(h) = distance_param(params, "land_height")? {
            timing.land_height = h;
        }

        Ok(())
    }

    /// Check every numeric field before a mission starts.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.maneuver.validate()?;
        self.failsafe.validate()?;

        if let ApproachMode::Stepped { step, .. } = self.approach {
            if !step.is_finite() || step <= 0.0 {
                return Err(NavError::Config(format!(
                    "step size must be positive, got {}",
                    step
                )));
            }
        }
        if let Some(tol) = self.arrival_tolerance {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(NavError::Config(format!(
                    "arrival tolerance must be positive, got {}",
                    tol
                )));
            }
        }
        if !self.default_altitude.is_finite() || self.default_altitude <= 0.0 {
            return Err(NavError::Config(format!(
                "default altitude must be positive, got {}",
                self.default_altitude
            )));
        }
        if !self.yaw.is_finite() {
            return Err(NavError::Config("yaw must be finite".into()));
        }
        let durations = [
            ("approach settle", self.approach.settle()),
            ("maneuver settle", self.maneuver.settle),
            ("mission timeout", self.failsafe.mission_timeout.unwrap_or_default()),
            ("arm settle", self.timing.arm_settle),
            ("takeoff settle", self.timing.takeoff_settle),
            ("inter-waypoint pause", self.timing.inter_waypoint),
            ("hover time", self.timing.hover),
            ("land duration", self.timing.land_duration),
            ("landing settle", self.timing.landing_settle),
        ];
        if let Some((name, d)) = durations.iter().find(|(_, d)| *d > MAX_DURATION) {
            return Err(NavError::Config(format!(
                "{} of {:?} exceeds {:?}",
                name, d, MAX_DURATION
            )));
        }
        if !self.timing.land_height.is_finite() || self.timing.land_height < 0.0 {
            return Err(NavError::Config(format!(
                "land height must be non-negative, got {}",
                self.timing.land_height
            )));
        }
        Ok(())
    }

    pub fn classifier(&self) -> ProximityClassifier {
        ProximityClassifier::new(self.thresholds, self.missing_reading)
    }

    pub fn tracker(&self) -> PositionTracker {
        PositionTracker::new(self.tracker_mode, self.default_altitude)
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            obstacle_policy: self.obstacle_policy,
            after_maneuver: self.after_maneuver,
            resume: self.resume,
            arrival_tolerance: self.arrival_tolerance,
        }
    }
}

/// Square patrol around the takeoff point, flown until each corner is reached.
pub fn square_route(leg_limit: Duration) -> Vec<Waypoint> {
    [
        (1.0, 0.0),
        (1.0, 0.7),
        (0.0, 0.7),
        (-1.0, 0.7),
        (-1.0, 0.0),
        (0.0, 0.0),
    ]
    .into_iter()
    .map(|(x, y)| Waypoint::new(x, y, 0.4, leg_limit))
    .collect()
}

/// Timed rectangle: 3 s on each of seven points at 0.4 m.
pub fn rectangle_sequence() -> Vec<Waypoint> {
    [
        (0.0, 0.0, 0.4, 3.0),
        (1.0, 0.0, 0.4, 3.0),
        (1.0, -0.4, 0.4, 3.0),
        (0.0, -0.4, 0.4, 3.0),
        (-1.0, -0.4, 0.4, 3.0),
        (-1.0, 0.0, 0.4, 3.0),
        (0.0, 0.0, 0.4, 3.0),
    ]
    .into_iter()
    .map(Waypoint::from_tuple)
    .collect()
}

/// Named mission variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    SquarePatrol,
    TimedSequence,
    SlowMediumRange,
    SlowLongRange,
    SingleObstacle,
    AlwaysDetect,
}

impl Profile {
    pub const ALL: [Profile; 6] = [
        Profile::SquarePatrol,
        Profile::TimedSequence,
        Profile::SlowMediumRange,
        Profile::SlowLongRange,
        Profile::SingleObstacle,
        Profile::AlwaysDetect,
    ];

    pub fn config(self) -> MissionConfig {
        let base = MissionConfig::default();
        let slow = |threshold: f64, maneuver: ManeuverConfig| MissionConfig {
            thresholds: ProximityThresholds::uniform(threshold),
            approach: ApproachMode::Stepped {
                step: 0.05,
                settle: Duration::from_millis(50),
            },
            maneuver,
            after_maneuver: AfterManeuver::EndWaypoint,
            failsafe: FailsafeConfig::disabled(),
            timing: MissionTiming {
                inter_waypoint: Duration::from_millis(300),
                ..MissionTiming::default()
            },
            ..MissionConfig::default()
        };

        match self {
            Profile::SquarePatrol => MissionConfig {
                approach: ApproachMode::Stepped {
                    step: 0.1,
                    settle: Duration::from_millis(200),
                },
                maneuver: ManeuverConfig {
                    forward_advance: 0.8,
                    ..ManeuverConfig::default()
                },
                arrival_tolerance: Some(0.05),
                tracker_mode: TrackerMode::DeadReckoning,
                timing: MissionTiming {
                    inter_waypoint: Duration::from_secs(1),
                    ..MissionTiming::default()
                },
                ..base
            },
            Profile::TimedSequence => MissionConfig {
                failsafe: FailsafeConfig {
                    check_link: false,
                    altitude: None,
                    ..FailsafeConfig::default()
                },
                ..base
            },
            Profile::SlowMediumRange => slow(
                0.45,
                ManeuverConfig {
                    bypass_side: Side::Right,
                    forward_advance: 0.8,
                    return_offset: 0.8,
                    ..ManeuverConfig::default()
                },
            ),
            Profile::SlowLongRange => slow(0.60, ManeuverConfig::default()),
            Profile::SingleObstacle => MissionConfig {
                obstacle_policy: ObstaclePolicy::OncePerMission,
                after_maneuver: AfterManeuver::EndWaypoint,
                failsafe: FailsafeConfig::disabled(),
                ..base
            },
            Profile::AlwaysDetect => MissionConfig {
                after_maneuver: AfterManeuver::EndWaypoint,
                failsafe: FailsafeConfig::disabled(),
                timing: MissionTiming {
                    inter_waypoint: Duration::from_millis(300),
                    ..MissionTiming::default()
                },
                ..base
            },
        }
    }

    pub fn waypoints(self) -> Vec<Waypoint> {
        match self {
            Profile::SquarePatrol => square_route(Duration::from_secs(20)),
            _ => rectangle_sequence(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Profile::SquarePatrol => "square-patrol",
            Profile::TimedSequence => "timed-sequence",
            Profile::SlowMediumRange => "slow-medium-range",
            Profile::SlowLongRange => "slow-long-range",
            Profile::SingleObstacle => "single-obstacle",
            Profile::AlwaysDetect => "always-detect",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Profile::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| NavError::Config(format!("unknown mission profile '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn defaults_are_valid_baseline() {
        let config = MissionConfig::default();
        config.validate().unwrap();
        assert_relative_eq!(config.thresholds.front, 0.25);
        assert_eq!(config.failsafe.mission_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.obstacle_policy, ObstaclePolicy::EveryTick);
        assert_eq!(config.approach.path_follower().name(), "SimplePathFollower");
    }

    #[test]
    fn every_profile_is_valid() {
        for profile in Profile::ALL {
            profile.config().validate().unwrap();
            assert!(!profile.waypoints().is_empty());
            assert_eq!(profile.to_string().parse::<Profile>().unwrap(), profile);
        }
    }

    #[test]
    fn profile_names_parse_loosely() {
        assert_eq!("Single_Obstacle".parse::<Profile>().unwrap(), Profile::SingleObstacle);
        assert!("figure-eight".parse::<Profile>().is_err());
    }

    #[test]
    fn routes_match_field_layouts() {
        let rect = rectangle_sequence();
        assert_eq!(rect.len(), 7);
        assert!(rect.iter().all(|w| w.duration == Duration::from_secs(3)));
        assert_relative_eq!(rect[2].target.y(), -0.4);

        let square = square_route(Duration::from_secs(20));
        assert_eq!(square.len(), 6);
        assert_relative_eq!(square[1].target.y(), 0.7);
    }

    #[test]
    fn configure_applies_overrides() {
        let mut config = MissionConfig::default();
        config
            .configure(&params(&[
                ("threshold", 0.45),
                ("right_threshold", 0.3),
                ("step_size", 0.05),
                ("forward_advance", 0.8),
                ("mission_timeout", 0.0),
                ("altitude_floor", 0.15),
                ("hover_time", 2.0),
                ("arm_settle", 0.5),
                ("not_a_key", 42.0),
            ]))
            .unwrap();

        assert_relative_eq!(config.thresholds.front, 0.45);
        assert_relative_eq!(config.thresholds.right, 0.3);
        assert!(matches!(config.approach, ApproachMode::Stepped { step, .. } if step == 0.05));
        assert_relative_eq!(config.maneuver.forward_advance, 0.8);
        assert_eq!(config.failsafe.mission_timeout, None);
        assert_eq!(config.failsafe.altitude.unwrap().floor, Some(0.15));
        assert_eq!(config.timing.hover, Duration::from_secs(2));
        assert_eq!(config.timing.arm_settle, Duration::from_millis(500));
    }

    #[test]
    fn configure_rejects_bad_values() {
        let mut config = MissionConfig::default();
        assert!(config.configure(&params(&[("threshold", -0.1)])).is_err());
        assert!(config.configure(&params(&[("hover_time", f64::NAN)])).is_err());
        assert!(config
            .configure(&params(&[("altitude_floor", 2.0)]))
            .is_err());
        assert_eq!(config, MissionConfig::default());

        let mut no_ceiling = MissionConfig::default();
        no_ceiling.failsafe.altitude = None;
        assert!(no_ceiling
            .configure(&params(&[("altitude_floor", 0.1)]))
            .is_err());
    }

    #[test]
    fn configure_rejects_out_of_range_durations() {
        let mut config = MissionConfig::default();
        assert!(config.configure(&params(&[("hover_time", 1e20)])).is_err());
        assert!(config.configure(&params(&[("takeoff_settle", 1e19)])).is_err());
        assert!(config.configure(&params(&[("mission_timeout", f64::INFINITY)])).is_err());
        assert!(config.configure(&params(&[("landing_settle", -1.0)])).is_err());
        assert_eq!(config, MissionConfig::default());

        config.configure(&params(&[("takeoff_settle", 86_400.0)])).unwrap();
        assert_eq!(config.timing.takeoff_settle, MAX_DURATION);

        config.timing.hover = MAX_DURATION + Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn timed_sequence_keeps_default_pauses() {
        let timing = Profile::TimedSequence.config().timing;
        assert_eq!(timing.inter_waypoint, Duration::from_millis(500));
        assert_eq!(timing.arm_settle, Duration::from_secs(1));
        assert_eq!(Profile::SquarePatrol.config().timing.inter_waypoint, Duration::from_secs(1));
    }
}
