//! Incremental setpoint generation

use crate::common::Pose;

/// Moves a setpoint toward a goal by at most `step` per horizontal axis.
///
/// Each axis is clamped to the remaining distance, so a step never passes the
/// goal. Altitude is taken straight from the goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInterpolator {
    step: f64,
}

impl StepInterpolator {
    pub fn new(step: f64) -> Self {
        StepInterpolator { step: step.abs() }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn next(&self, current: &Pose, goal: &Pose) -> Pose {
        Pose::new(
            advance(current.x(), goal.x(), self.step),
            advance(current.y(), goal.y(), self.step),
            goal.z(),
        )
    }
}

fn advance(from: f64, to: f64, step: f64) -> f64 {
    let remaining = to - from;
    if remaining.abs() <= step {
        to
    } else {
        from + step.copysign(remaining)
    }
}
