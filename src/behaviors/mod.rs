//! Behaviors module: reactions layered on top of goal seeking
pub mod avoidance;

pub use avoidance::{AvoidanceEngine, ManeuverConfig, ManeuverOutcome, ManeuverState, Side};
