//! Reactive waypoint navigation for small aerial vehicles.
//!
//! A mission takes off, visits an ordered list of waypoints while reacting
//! to nearby obstacles reported by a multi-directional ranger, hovers and
//! lands. Failsafes and a manual abort channel wrap the whole mission.
pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod mission;
pub mod navigation;
pub mod perception;
pub mod safety;
pub mod sim;

pub use crate::common::{Pose, Waypoint};
pub use crate::config::{MissionConfig, Profile};
pub use crate::error::{NavError, Result};
pub use crate::mission::abort::AbortHandle;
pub use crate::mission::{MissionController, MissionOutcome, MissionReport};

use crate::sim::SimVehicle;
use std::collections::HashMap;

/// Build a controller for `profile` against the simulator, applying
/// `overrides` on top of the profile's configuration.
pub fn simulated_mission(
    profile: Profile,
    vehicle: &SimVehicle,
    overrides: &HashMap<String, f64>,
) -> Result<MissionController<sim::SimFlight, sim::SimRanger, sim::SimLink>> {
    let mut config = profile.config();
    config.configure(overrides)?;
    MissionController::new(
        config,
        profile.waypoints(),
        vehicle.flight(),
        vehicle.ranger(),
        vehicle.link(),
    )
}
