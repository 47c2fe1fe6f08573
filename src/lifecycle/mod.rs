//! Mission phase lifecycle

use crate::error::{NavError, Result};
use log::info;

/// Phase of a mission. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionPhase {
    Takeoff,
    Navigating,
    Avoiding,
    Hovering,
    Landing,
    Aborted,
    Done,
}

impl MissionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionPhase::Aborted | MissionPhase::Done)
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: MissionPhase) -> bool {
        use MissionPhase::*;
        matches!(
            (self, to),
            (Takeoff, Navigating)
                | (Takeoff, Landing)
                | (Navigating, Avoiding)
                | (Navigating, Hovering)
                | (Navigating, Landing)
                | (Avoiding, Navigating)
                | (Avoiding, Landing)
                | (Hovering, Landing)
                | (Landing, Done)
                | (Landing, Aborted)
        )
    }
}

/// Tracks the active phase and the path taken through the lifecycle.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    pub name: String,
    phase: MissionPhase,
    history: Vec<MissionPhase>,
}

impl PhaseTracker {
    /// Create a tracker in the takeoff phase
    pub fn new(name: &str) -> Self {
        PhaseTracker {
            name: name.to_string(),
            phase: MissionPhase::Takeoff,
            history: vec![MissionPhase::Takeoff],
        }
    }

    /// Get the current phase
    pub fn get_phase(&self) -> MissionPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[MissionPhase] {
        &self.history
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn set_phase(&mut self, to: MissionPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            return Err(NavError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        info!("[{}] {:?} -> {:?}", self.name, self.phase, to);
        self.phase = to;
        self.history.push(to);
        Ok(())
    }
}
