//! Sensor interfaces for the vehicle

use crate::error::Result;

/// Fixed directions of the proximity rangers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Front,
    Right,
    Left,
    Up,
}

/// One poll of the four proximity rangers, in meters.
///
/// `None` means the ranger produced no measurement. It is not the same as
/// "far away".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProximityReading {
    pub front: Option<f64>,
    pub right: Option<f64>,
    pub left: Option<f64>,
    pub up: Option<f64>,
}

impl ProximityReading {
    /// A reading where no ranger reported anything.
    pub fn absent() -> Self {
        ProximityReading::default()
    }

    pub fn get(&self, direction: Direction) -> Option<f64> {
        let value = match direction {
            Direction::Front => self.front,
            Direction::Right => self.right,
            Direction::Left => self.left,
            Direction::Up => self.up,
        };
        // NaN and infinities are not measurements
        value.filter(|d| d.is_finite())
    }

    pub fn with(mut self, direction: Direction, distance: f64) -> Self {
        match direction {
            Direction::Front => self.front = Some(distance),
            Direction::Right => self.right = Some(distance),
            Direction::Left => self.left = Some(distance),
            Direction::Up => self.up = Some(distance),
        }
        self
    }
}

/// A polled multi-direction proximity sensor.
pub trait ProximitySensor: Send {
    /// Get the sensor name
    fn name(&self) -> &str;

    /// Take one snapshot of all rangers.
    fn read(&mut self) -> Result<ProximityReading>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_read_as_absent() {
        let reading = ProximityReading {
            front: Some(f64::NAN),
            right: Some(f64::INFINITY),
            left: Some(0.3),
            up: None,
        };
        assert_eq!(reading.get(Direction::Front), None);
        assert_eq!(reading.get(Direction::Right), None);
        assert_eq!(reading.get(Direction::Left), Some(0.3));
        assert_eq!(reading.get(Direction::Up), None);
    }
}
