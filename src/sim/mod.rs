//! In-process vehicle simulator
//!
//! A kinematic stand-in for the real vehicle: position commands are applied
//! instantly, the rangers are computed from vertical pole obstacles and an
//! optional ceiling, and every command is logged for inspection. Readings can
//! also be scripted and faults injected, which is what the tests use it for.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::common::Pose;
use crate::control::controllers::{FlightController, LinkMonitor};
use crate::error::{NavError, Result};
use crate::perception::sensors::{ProximityReading, ProximitySensor};

/// Maximum distance the simulated rangers report.
pub const RANGER_MAX_RANGE: f64 = 4.0;

/// A command received by the simulated flight controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimCommand {
    Arm,
    Takeoff(f64),
    MoveTo(Pose),
    Land { height: f64, duration: Duration },
}

/// A vertical cylinder obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pole {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

#[derive(Debug)]
struct SimWorld {
    position: Pose,
    commands: Vec<SimCommand>,
    obstacles: Vec<Pole>,
    ceiling: Option<f64>,
    scripted: VecDeque<ProximityReading>,
    fixed_reading: Option<ProximityReading>,
    link_healthy: bool,
    fail_land: bool,
    fail_position: bool,
    fail_sensor: bool,
    fail_move_after: Option<usize>,
    sensor_reads: usize,
}

impl SimWorld {
    fn ranger_reading(&self) -> ProximityReading {
        let p = self.position;
        let in_range = |d: f64| (d <= RANGER_MAX_RANGE).then_some(d.max(0.0));
        let front = self
            .obstacles
            .iter()
            .filter(|o| (o.y - p.y()).abs() <= o.radius && o.x > p.x())
            .map(|o| o.x - p.x() - o.radius)
            .reduce(f64::min);
        let right = self
            .obstacles
            .iter()
            .filter(|o| (o.x - p.x()).abs() <= o.radius && o.y > p.y())
            .map(|o| o.y - p.y() - o.radius)
            .reduce(f64::min);
        let left = self
            .obstacles
            .iter()
            .filter(|o| (o.x - p.x()).abs() <= o.radius && o.y < p.y())
            .map(|o| p.y() - o.y - o.radius)
            .reduce(f64::min);

        ProximityReading {
            front: front.and_then(in_range),
            right: right.and_then(in_range),
            left: left.and_then(in_range),
            up: self.ceiling.map(|c| c - p.z()).and_then(in_range),
        }
    }
}

/// Shared simulator state. Hand out the component views with
/// [`SimVehicle::flight`], [`SimVehicle::ranger`] and [`SimVehicle::link`].
#[derive(Debug, Clone)]
pub struct SimVehicle {
    world: Arc<Mutex<SimWorld>>,
}

impl Default for SimVehicle {
    fn default() -> Self {
        SimVehicle::new()
    }
}

impl SimVehicle {
    pub fn new() -> Self {
        SimVehicle {
            world: Arc::new(Mutex::new(SimWorld {
                position: Pose::new(0.0, 0.0, 0.0),
                commands: Vec::new(),
                obstacles: Vec::new(),
                ceiling: None,
                scripted: VecDeque::new(),
                fixed_reading: None,
                link_healthy: true,
                fail_land: false,
                fail_position: false,
                fail_sensor: false,
                fail_move_after: None,
                sensor_reads: 0,
            })),
        }
    }

    fn world(&self) -> MutexGuard<'_, SimWorld> {
        self.world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn flight(&self) -> SimFlight {
        SimFlight { sim: self.clone() }
    }

    pub fn ranger(&self) -> SimRanger {
        SimRanger { sim: self.clone() }
    }

    pub fn link(&self) -> SimLink {
        SimLink { sim: self.clone() }
    }

    pub fn add_obstacle(&self, pole: Pole) {
        self.world().obstacles.push(pole);
    }

    pub fn set_ceiling(&self, height: Option<f64>) {
        self.world().ceiling = height;
    }

    /// Queue readings returned (in order) before falling back to the fixed
    /// reading or the geometric model.
    pub fn script_readings<I: IntoIterator<Item = ProximityReading>>(&self, readings: I) {
        self.world().scripted.extend(readings);
    }

    /// Return this reading on every poll once the script is exhausted.
    pub fn set_fixed_reading(&self, reading: Option<ProximityReading>) {
        self.world().fixed_reading = reading;
    }

    pub fn set_link_healthy(&self, healthy: bool) {
        self.world().link_healthy = healthy;
    }

    pub fn fail_land(&self, fail: bool) {
        self.world().fail_land = fail;
    }

    pub fn fail_position(&self, fail: bool) {
        self.world().fail_position = fail;
    }

    pub fn fail_sensor(&self, fail: bool) {
        self.world().fail_sensor = fail;
    }

    /// Reject every position command after `count` have been accepted.
    pub fn fail_moves_after(&self, count: Option<usize>) {
        self.world().fail_move_after = count;
    }

    pub fn position(&self) -> Pose {
        self.world().position
    }

    pub fn commands(&self) -> Vec<SimCommand> {
        self.world().commands.clone()
    }

    pub fn move_commands(&self) -> Vec<Pose> {
        self.world()
            .commands
            .iter()
            .filter_map(|c| match c {
                SimCommand::MoveTo(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn sensor_reads(&self) -> usize {
        self.world().sensor_reads
    }
}

/// Flight controller view of the simulator.
#[derive(Debug, Clone)]
pub struct SimFlight {
    sim: SimVehicle,
}

impl FlightController for SimFlight {
    fn arm(&mut self) -> Result<()> {
        self.sim.world().commands.push(SimCommand::Arm);
        Ok(())
    }

    fn takeoff(&mut self, height: f64) -> Result<()> {
        let mut world = self.sim.world();
        world.commands.push(SimCommand::Takeoff(height));
        let p = world.position;
        world.position = Pose::new(p.x(), p.y(), height);
        Ok(())
    }

    fn move_to(&mut self, target: &Pose, _yaw: f64) -> Result<()> {
        let mut world = self.sim.world();
        let accepted = world
            .commands
            .iter()
            .filter(|c| matches!(c, SimCommand::MoveTo(_)))
            .count();
        if world.fail_move_after.is_some_and(|limit| accepted >= limit) {
            return Err(NavError::FlightController("setpoint rejected".into()));
        }
        world.commands.push(SimCommand::MoveTo(*target));
        world.position = *target;
        Ok(())
    }

    fn land(&mut self, height: f64, duration: Duration) -> Result<()> {
        let mut world = self.sim.world();
        if world.fail_land {
            return Err(NavError::FlightController("land command not acknowledged".into()));
        }
        world.commands.push(SimCommand::Land { height, duration });
        let p = world.position;
        world.position = Pose::new(p.x(), p.y(), height);
        Ok(())
    }

    fn current_position(&mut self) -> Result<Pose> {
        let world = self.sim.world();
        if world.fail_position {
            return Err(NavError::PositionUnavailable("estimator offline".into()));
        }
        Ok(world.position)
    }
}

/// Multi-ranger view of the simulator.
#[derive(Debug, Clone)]
pub struct SimRanger {
    sim: SimVehicle,
}

impl ProximitySensor for SimRanger {
    fn name(&self) -> &str {
        "sim_multiranger"
    }

    fn read(&mut self) -> Result<ProximityReading> {
        let mut world = self.sim.world();
        world.sensor_reads += 1;
        if world.fail_sensor {
            return Err(NavError::SensorUnavailable("ranger deck not responding".into()));
        }
        if let Some(reading) = world.scripted.pop_front() {
            return Ok(reading);
        }
        Ok(world
            .fixed_reading
            .unwrap_or_else(|| world.ranger_reading()))
    }
}

/// Radio link view of the simulator.
#[derive(Debug, Clone)]
pub struct SimLink {
    sim: SimVehicle,
}

impl LinkMonitor for SimLink {
    fn is_healthy(&mut self) -> bool {
        self.sim.world().link_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rangers_see_poles_along_their_axis() {
        let sim = SimVehicle::new();
        sim.add_obstacle(Pole { x: 1.0, y: 0.0, radius: 0.1 });
        sim.add_obstacle(Pole { x: 0.0, y: 0.6, radius: 0.1 });
        sim.set_ceiling(Some(2.0));
        sim.flight().takeoff(0.4).unwrap();

        let reading = sim.ranger().read().unwrap();
        assert_relative_eq!(reading.front.unwrap(), 0.9);
        assert_relative_eq!(reading.right.unwrap(), 0.5);
        assert_eq!(reading.left, None);
        assert_relative_eq!(reading.up.unwrap(), 1.6);
    }

    #[test]
    fn scripted_readings_take_precedence() {
        let sim = SimVehicle::new();
        sim.script_readings([ProximityReading {
            front: Some(0.1),
            ..ProximityReading::default()
        }]);
        let mut ranger = sim.ranger();
        assert_eq!(ranger.read().unwrap().front, Some(0.1));
        assert_eq!(ranger.read().unwrap().front, None);
        assert_eq!(sim.sensor_reads(), 2);
    }

    #[test]
    fn injected_faults_surface_as_errors() {
        let sim = SimVehicle::new();
        sim.fail_land(true);
        sim.fail_position(true);
        let mut flight = sim.flight();
        assert!(flight.land(0.0, Duration::from_secs(2)).is_err());
        assert!(flight.current_position().is_err());
        sim.fail_moves_after(Some(0));
        assert!(flight.move_to(&Pose::new(1.0, 0.0, 0.4), 0.0).is_err());
        assert!(sim.commands().is_empty());
    }
}
