//! Error types for the navigation core

use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::MissionPhase;
use crate::safety::FailsafeKind;

/// Errors raised while flying a mission.
///
/// Sensor and position errors are absorbed inside a control tick; every other
/// variant ends the mission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("proximity sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("position estimate unavailable: {0}")]
    PositionUnavailable(String),

    #[error("communication link lost")]
    LinkLost,

    #[error("mission time ceiling of {limit:?} exceeded")]
    Timeout { limit: Duration },

    #[error("altitude violation ({kind:?}): upward range {range:.2} m")]
    AltitudeViolation { kind: FailsafeKind, range: f64 },

    #[error("manual abort requested")]
    ManualAbort,

    #[error("flight controller failure: {0}")]
    FlightController(String),

    #[error("unexpected runtime error: {0}")]
    Runtime(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("illegal phase transition {from:?} -> {to:?}")]
    InvalidTransition { from: MissionPhase, to: MissionPhase },
}

impl NavError {
    /// The failsafe this error escalates to. `None` for errors the
    /// perception layer absorbs.
    pub fn failsafe_kind(&self) -> Option<FailsafeKind> {
        match self {
            NavError::SensorUnavailable(_) | NavError::PositionUnavailable(_) => None,
            NavError::LinkLost => Some(FailsafeKind::LinkLost),
            NavError::Timeout { .. } => Some(FailsafeKind::Timeout),
            NavError::AltitudeViolation { kind, .. } => Some(*kind),
            NavError::ManualAbort => Some(FailsafeKind::ManualAbort),
            NavError::FlightController(_)
            | NavError::Runtime(_)
            | NavError::Config(_)
            | NavError::InvalidTransition { .. } => Some(FailsafeKind::RuntimeError),
        }
    }
}

pub type Result<T> = std::result::Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_errors_are_absorbed() {
        assert_eq!(NavError::SensorUnavailable("i2c".into()).failsafe_kind(), None);
        assert_eq!(NavError::PositionUnavailable("x".into()).failsafe_kind(), None);
    }

    #[test]
    fn fatal_errors_map_to_failsafes() {
        assert_eq!(
            NavError::LinkLost.failsafe_kind(),
            Some(FailsafeKind::LinkLost)
        );
        assert_eq!(
            NavError::ManualAbort.failsafe_kind(),
            Some(FailsafeKind::ManualAbort)
        );
        assert_eq!(
            NavError::FlightController("radio".into()).failsafe_kind(),
            Some(FailsafeKind::RuntimeError)
        );
        let err = NavError::AltitudeViolation {
            kind: FailsafeKind::AltitudeLow,
            range: 0.1,
        };
        assert_eq!(err.failsafe_kind(), Some(FailsafeKind::AltitudeLow));
    }
}
