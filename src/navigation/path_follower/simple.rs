//! Simple path follower implementation

use super::PathFollower;
use crate::common::Pose;
use std::time::Duration;

/// Commands the goal directly every tick and lets the flight controller fly there.
#[derive(Debug, Clone)]
pub struct SimplePathFollower {
    settle: Duration,
}

impl SimplePathFollower {
    pub fn with_settle(settle: Duration) -> Self {
        SimplePathFollower { settle }
    }
}

impl PathFollower for SimplePathFollower {
    fn new() -> Self {
        SimplePathFollower {
            settle: Duration::from_millis(100),
        }
    }

    fn next_setpoint(&self, _current: &Pose, goal: &Pose) -> Pose {
        *goal
    }

    fn settle_time(&self) -> Duration {
        self.settle
    }

    fn name(&self) -> &str {
        "SimplePathFollower"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_commands_goal() {
        let follower = SimplePathFollower::new();
        let goal = Pose::new(1.0, 0.7, 0.4);
        assert_eq!(follower.next_setpoint(&Pose::new(-3.0, 2.0, 0.1), &goal), goal);
        assert_eq!(follower.settle_time(), Duration::from_millis(100));
    }

    #[test]
    fn custom_settle_is_kept() {
        let follower = SimplePathFollower::with_settle(Duration::from_millis(200));
        assert_eq!(follower.settle_time(), Duration::from_millis(200));
        assert_eq!(follower.name(), "SimplePathFollower");
    }
}
