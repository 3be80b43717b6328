use num_traits::Float;

use crate::control::ClosedLoopController;
use crate::hal::{Actuator, PositionSensor};
use crate::Error;

/// A position sensor, actuator and controller driving one rotational axis.
pub struct Axis<S, A> {
    pub sensor: S,
    pub actuator: A,
    pub controller: ClosedLoopController,
}

impl<S, A> Axis<S, A>
where
    S: PositionSensor,
    A: Actuator,
{
    pub fn new(sensor: S, actuator: A, controller: ClosedLoopController) -> Self {
        Self {
            sensor,
            actuator,
            controller,
        }
    }

    /// Sample the sensor and calculate the command without driving the actuator.
    pub fn command(&mut self) -> f64 {
        self.sensor.update();
        self.controller.run(self.sensor.read() as f64)
    }

    /// Run one closed loop step and return the command that was output.
    pub fn drive(&mut self) -> Result<f64, Error> {
        let command = self.command();
        self.actuator.set_command(command)?;
        Ok(command)
    }
}

/// Returns `true` once the command magnitude falls under `epsilon`.
pub fn settled(command: f64, epsilon: f64) -> bool {
    Float::abs(command) < epsilon
}
