//! Hardware abstractions consumed by the turret tasks.
//!
//! Tasks only ever see the traits in this module, so each one can be handed a
//! real driver on the board or a [`sim`](crate::sim) double on the host.

use crate::Error;

pub mod encoder;
pub use encoder::{Encoder, PositionState};

pub mod hbridge;
pub use hbridge::{Direction, DriverFault, FaultLatch, HBridge};

pub mod thermal;
pub use thermal::{ThermalCamera, ThermalFrame};

pub trait Actuator {
    /// Output a signed command, saturated to [-1, 1].
    /// A command of exactly zero brakes the motor.
    fn set_command(&mut self, command: f64) -> Result<(), Error>;

    /// Drive both channels to full duty (short brake).
    fn brake(&mut self) -> Result<(), Error>;

    /// Drive both channels to zero duty and let the motor freewheel.
    fn coast(&mut self) -> Result<(), Error>;

    fn enable(&mut self) -> Result<(), Error>;

    fn disable(&mut self) -> Result<(), Error>;

    fn is_enabled(&self) -> bool;
}

impl<T> Actuator for &mut T
where
    T: Actuator + ?Sized,
{
    fn set_command(&mut self, command: f64) -> Result<(), Error> {
        (**self).set_command(command)
    }

    fn brake(&mut self) -> Result<(), Error> {
        (**self).brake()
    }

    fn coast(&mut self) -> Result<(), Error> {
        (**self).coast()
    }

    fn enable(&mut self) -> Result<(), Error> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<(), Error> {
        (**self).disable()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}

pub trait PositionSensor {
    /// Sample the hardware counter and accumulate the corrected delta.
    fn update(&mut self);

    /// The accumulated position (in counts).
    fn read(&self) -> i64;

    /// Clear the accumulated position without forgetting the last raw sample.
    fn zero(&mut self);
}

impl<T> PositionSensor for &mut T
where
    T: PositionSensor + ?Sized,
{
    fn update(&mut self) {
        (**self).update()
    }

    fn read(&self) -> i64 {
        (**self).read()
    }

    fn zero(&mut self) {
        (**self).zero()
    }
}
