//! Slow-mode follower: small fixed steps from the tracked position

use super::PathFollower;
use crate::common::Pose;
use crate::control::trajectory::StepInterpolator;
use std::time::Duration;

/// Approaches the goal in increments of at most `step` meters per axis,
/// recomputed from the tracked position every tick.
#[derive(Debug, Clone)]
pub struct SteppedPathFollower {
    interpolator: StepInterpolator,
    settle: Duration,
}

impl SteppedPathFollower {
    pub fn with_step(step: f64, settle: Duration) -> Self {
        SteppedPathFollower {
            interpolator: StepInterpolator::new(step),
            settle,
        }
    }

    pub fn step(&self) -> f64 {
        self.interpolator.step()
    }
}

impl PathFollower for SteppedPathFollower {
    fn new() -> Self {
        SteppedPathFollower::with_step(0.05, Duration::from_millis(50))
    }

    fn next_setpoint(&self, current: &Pose, goal: &Pose) -> Pose {
        self.interpolator.next(current, goal)
    }

    fn settle_time(&self) -> Duration {
        self.settle
    }

    fn name(&self) -> &str {
        "SteppedPathFollower"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approaches_without_overshoot() {
        let follower = SteppedPathFollower::new();
        let goal = Pose::new(1.0, -0.4, 0.4);
        let mut current = Pose::new(0.0, 0.0, 0.4);
        let mut steps = 0;
        while current != goal {
            let next = follower.next_setpoint(&current, &goal);
            assert!(next.distance_to(&goal) <= current.distance_to(&goal));
            current = next;
            steps += 1;
            assert!(steps <= 21);
        }
        assert!(steps >= 20);
    }

    #[test]
    fn with_step_sets_increment() {
        let follower = SteppedPathFollower::with_step(0.1, Duration::from_millis(200));
        assert_eq!(follower.step(), 0.1);
        assert_eq!(follower.settle_time(), Duration::from_millis(200));
        let next = follower.next_setpoint(&Pose::new(0.0, 0.0, 0.4), &Pose::new(1.0, 0.0, 0.4));
        assert_eq!(next, Pose::new(0.1, 0.0, 0.4));
    }
}
