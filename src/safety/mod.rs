//! Failsafe supervision
//!
//! Mission-level checks evaluated before each waypoint, in fixed order:
//! elapsed time, link health, then altitude bounds from the upward ranger.
//! The first trigger is sticky for the rest of the mission.

use crate::error::{NavError, Result};
use log::warn;
use std::time::Duration;

/// Kinds of mission-ending conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailsafeKind {
    Timeout,
    LinkLost,
    AltitudeHigh,
    AltitudeLow,
    ManualAbort,
    RuntimeError,
}

/// A raised failsafe, stamped with mission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailsafeTrigger {
    pub kind: FailsafeKind,
    pub at: Duration,
}

/// Bounds on the upward ranger distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeBounds {
    pub ceiling: f64,
    pub floor: Option<f64>,
}

/// Which checks run and their limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailsafeConfig {
    /// Mission time ceiling, `None` disables the check.
    pub mission_timeout: Option<Duration>,
    pub check_link: bool,
    /// `None` disables the altitude checks.
    pub altitude: Option<AltitudeBounds>,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        FailsafeConfig {
            mission_timeout: Some(Duration::from_secs(60)),
            check_link: true,
            altitude: Some(AltitudeBounds {
                ceiling: 1.5,
                floor: None,
            }),
        }
    }
}

impl FailsafeConfig {
    /// Every check turned off.
    pub fn disabled() -> Self {
        FailsafeConfig {
            mission_timeout: None,
            check_link: false,
            altitude: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(bounds) = self.altitude {
            if !bounds.ceiling.is_finite() || bounds.ceiling <= 0.0 {
                return Err(NavError::Config(format!(
                    "altitude ceiling must be positive, got {}",
                    bounds.ceiling
                )));
            }
            if let Some(floor) = bounds.floor {
                if !floor.is_finite() || floor < 0.0 || floor >= bounds.ceiling {
                    return Err(NavError::Config(format!(
                        "altitude floor {} must lie in [0, {})",
                        floor, bounds.ceiling
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Inputs for one supervisor evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailsafeInputs {
    pub elapsed: Duration,
    pub link_healthy: bool,
    pub up_range: Option<f64>,
}

/// Read-only monitor of mission-level safety conditions.
#[derive(Debug, Clone)]
pub struct FailsafeSupervisor {
    config: FailsafeConfig,
    tripped: Option<(FailsafeTrigger, NavError)>,
}

impl FailsafeSupervisor {
    pub fn new(config: FailsafeConfig) -> Self {
        FailsafeSupervisor {
            config,
            tripped: None,
        }
    }

    pub fn config(&self) -> &FailsafeConfig {
        &self.config
    }

    /// Evaluate the checks. Once anything trips, every later call returns the
    /// same trigger.
    pub fn check(&mut self, inputs: FailsafeInputs) -> Option<FailsafeTrigger> {
        if let Some((trigger, _)) = &self.tripped {
            return Some(*trigger);
        }

        let cause = self.evaluate(&inputs)?;
        let kind = cause.failsafe_kind().unwrap_or(FailsafeKind::RuntimeError);
        let trigger = FailsafeTrigger {
            kind,
            at: inputs.elapsed,
        };
        warn!("Failsafe {:?} at {:?}: {}", kind, inputs.elapsed, cause);
        self.tripped = Some((trigger, cause));
        Some(trigger)
    }

    /// The raised trigger and its cause, if any.
    pub fn tripped(&self) -> Option<&(FailsafeTrigger, NavError)> {
        self.tripped.as_ref()
    }

    fn evaluate(&self, inputs: &FailsafeInputs) -> Option<NavError> {
        if let Some(limit) = self.config.mission_timeout {
            if inputs.elapsed > limit {
                return Some(NavError::Timeout { limit });
            }
        }

        if self.config.check_link && !inputs.link_healthy {
            return Some(NavError::LinkLost);
        }

        // an absent upward reading never trips the altitude checks
        if let (Some(bounds), Some(range)) = (self.config.altitude, inputs.up_range) {
            if range > bounds.ceiling {
                return Some(NavError::AltitudeViolation {
                    kind: FailsafeKind::AltitudeHigh,
                    range,
                });
            }
            if bounds.floor.is_some_and(|floor| range < floor) {
                return Some(NavError::AltitudeViolation {
                    kind: FailsafeKind::AltitudeLow,
                    range,
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal(elapsed: Duration) -> FailsafeInputs {
        FailsafeInputs {
            elapsed,
            link_healthy: true,
            up_range: Some(1.0),
        }
    }

    #[test]
    fn quiet_when_nominal() {
        let mut supervisor = FailsafeSupervisor::new(FailsafeConfig::default());
        assert_eq!(supervisor.check(nominal(Duration::from_secs(30))), None);
        assert_eq!(supervisor.check(nominal(Duration::from_secs(60))), None);
    }

    #[test]
    fn timeout_after_ceiling() {
        let mut supervisor = FailsafeSupervisor::new(FailsafeConfig::default());
        let trigger = supervisor.check(nominal(Duration::from_secs(61))).unwrap();
        assert_eq!(trigger.kind, FailsafeKind::Timeout);
        assert_eq!(trigger.at, Duration::from_secs(61));
    }

    #[test]
    fn timeout_is_checked_before_link() {
        let mut supervisor = FailsafeSupervisor::new(FailsafeConfig::default());
        let inputs = FailsafeInputs {
            elapsed: Duration::from_secs(90),
            link_healthy: false,
            up_range: Some(3.0),
        };
        assert_eq!(supervisor.check(inputs).unwrap().kind, FailsafeKind::Timeout);
    }

    #[test]
    fn link_is_checked_before_altitude() {
        let mut supervisor = FailsafeSupervisor::new(FailsafeConfig::default());
        let inputs = FailsafeInputs {
            elapsed: Duration::from_secs(1),
            link_healthy: false,
            up_range: Some(3.0),
        };
        assert_eq!(supervisor.check(inputs).unwrap().kind, FailsafeKind::LinkLost);
    }

    #[test]
    fn altitude_bounds() {
        let config = FailsafeConfig {
            altitude: Some(AltitudeBounds {
                ceiling: 1.5,
                floor: Some(0.15),
            }),
            ..FailsafeConfig::default()
        };

        let mut high = FailsafeSupervisor::new(config);
        let inputs = FailsafeInputs {
            up_range: Some(1.6),
            ..nominal(Duration::ZERO)
        };
        assert_eq!(high.check(inputs).unwrap().kind, FailsafeKind::AltitudeHigh);

        let mut low = FailsafeSupervisor::new(config);
        let inputs = FailsafeInputs {
            up_range: Some(0.1),
            ..nominal(Duration::ZERO)
        };
        assert_eq!(low.check(inputs).unwrap().kind, FailsafeKind::AltitudeLow);

        let mut absent = FailsafeSupervisor::new(config);
        let inputs = FailsafeInputs {
            up_range: None,
            ..nominal(Duration::ZERO)
        };
        assert_eq!(absent.check(inputs), None);
    }

    #[test]
    fn trigger_is_sticky() {
        let mut supervisor = FailsafeSupervisor::new(FailsafeConfig::default());
        let first = supervisor
            .check(FailsafeInputs {
                link_healthy: false,
                ..nominal(Duration::from_secs(5))
            })
            .unwrap();
        let later = supervisor.check(nominal(Duration::from_secs(6))).unwrap();
        assert_eq!(first, later);
        assert_eq!(supervisor.tripped().unwrap().1, NavError::LinkLost);
    }

    #[test]
    fn disabled_checks_never_trip() {
        let mut supervisor = FailsafeSupervisor::new(FailsafeConfig::disabled());
        let inputs = FailsafeInputs {
            elapsed: Duration::from_secs(3600),
            link_healthy: false,
            up_range: Some(10.0),
        };
        assert_eq!(supervisor.check(inputs), None);
    }

    #[test]
    fn rejects_floor_above_ceiling() {
        let config = FailsafeConfig {
            altitude: Some(AltitudeBounds {
                ceiling: 1.0,
                floor: Some(1.2),
            }),
            ..FailsafeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
