//! Dual-channel H-bridge motor driver.
//!
//! | forward | reverse | motor state               |
//! |---------|---------|---------------------------|
//! | 0       | 0       | coast (freewheel)         |
//! | PWM     | 0       | forward                   |
//! | 0       | PWM     | reverse                   |
//! | max     | max     | brake (terminals shorted) |

use core::sync::atomic::{AtomicU8, Ordering};
use embedded_hal::{digital::v2::OutputPin, PwmPin};
use num_traits::{Float, NumCast};

use super::Actuator;
use crate::Error;

/// A fault reported by the driver's fault line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverFault {
    Undervoltage = 1,
    Overvoltage,
    Overcurrent,
    ShortCircuit,
    OpenLoad,
    Overtemperature,
}

impl DriverFault {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Undervoltage,
            2 => Self::Overvoltage,
            3 => Self::Overcurrent,
            4 => Self::ShortCircuit,
            5 => Self::OpenLoad,
            6 => Self::Overtemperature,
            _ => return None,
        })
    }
}

/// A fault flag that an interrupt handler can trip.
///
/// The driver holding the latch services it before every output and disables
/// itself when a fault is pending.
#[derive(Debug, Default)]
pub struct FaultLatch {
    code: AtomicU8,
}

impl FaultLatch {
    pub const fn new() -> Self {
        Self {
            code: AtomicU8::new(0),
        }
    }

    /// Record a fault. Safe to call from interrupt context.
    pub fn trip(&self, fault: DriverFault) {
        self.code.store(fault as u8, Ordering::Release);
    }

    /// Take the pending fault, clearing the latch.
    pub fn take(&self) -> Option<DriverFault> {
        DriverFault::from_code(self.code.swap(0, Ordering::AcqRel))
    }

    pub fn is_tripped(&self) -> bool {
        self.code.load(Ordering::Acquire) != 0
    }
}

/// The drive direction of the last output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    Stopped,
}

/// H-bridge driver with two PWM inputs and an enable line.
pub struct HBridge<'a, F, R, EN> {
    forward: F,
    reverse: R,
    enable: EN,
    is_enabled: bool,
    duty: f64,
    direction: Direction,
    fault: Option<&'a FaultLatch>,
    name: &'static str,
}

impl<'a, F, R, EN> HBridge<'a, F, R, EN>
where
    F: PwmPin,
    R: PwmPin<Duty = F::Duty>,
    F::Duty: NumCast + Copy,
    EN: OutputPin,
{
    /// Create a new driver. Both channels start at zero duty and the
    /// enable line is held low until [`enable`](Actuator::enable) is called.
    pub fn new(mut forward: F, mut reverse: R, mut enable: EN) -> Result<Self, Error> {
        enable.set_low().map_err(|_| Error::Pin)?;
        forward.enable();
        reverse.enable();
        forward.set_duty(scaled_duty(&forward, 0.));
        reverse.set_duty(scaled_duty(&reverse, 0.));

        Ok(Self {
            forward,
            reverse,
            enable,
            is_enabled: false,
            duty: 0.,
            direction: Direction::Stopped,
            fault: None,
            name: "motor",
        })
    }

    /// Builder method to set `name` and return `self`
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Builder method to attach a fault latch and return `self`
    pub fn with_fault_latch(mut self, latch: &'a FaultLatch) -> Self {
        self.fault = Some(latch);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The magnitude of the last commanded duty in [0, 1].
    pub fn duty(&self) -> f64 {
        self.duty
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Handle a hardware fault by disabling the driver.
    /// The driver stays disabled until it is explicitly re-enabled.
    pub fn fault_cb(&mut self, fault: DriverFault) -> Result<(), Error> {
        log::error!("{}: driver fault {:?}, suspending output", self.name, fault);
        self.disable()
    }

    fn service_fault(&mut self) -> Result<(), Error> {
        if let Some(fault) = self.fault.and_then(FaultLatch::take) {
            self.fault_cb(fault)?;
        }
        Ok(())
    }

    fn write(&mut self, forward: f64, reverse: f64) {
        self.forward.set_duty(scaled_duty(&self.forward, forward));
        self.reverse.set_duty(scaled_duty(&self.reverse, reverse));
    }
}

impl<'a, F, R, EN> Actuator for HBridge<'a, F, R, EN>
where
    F: PwmPin,
    R: PwmPin<Duty = F::Duty>,
    F::Duty: NumCast + Copy,
    EN: OutputPin,
{
    fn set_command(&mut self, command: f64) -> Result<(), Error> {
        self.service_fault()?;
        if !self.is_enabled {
            return Ok(());
        }

        if command == 0. || command.is_nan() {
            return self.brake();
        }

        let duty = Float::min(Float::abs(command), 1.);
        if command > 0. {
            // The idle channel is cleared before the active one is driven
            self.reverse.set_duty(scaled_duty(&self.reverse, 0.));
            self.forward.set_duty(scaled_duty(&self.forward, duty));
            self.direction = Direction::Forward;
        } else {
            self.forward.set_duty(scaled_duty(&self.forward, 0.));
            self.reverse.set_duty(scaled_duty(&self.reverse, duty));
            self.direction = Direction::Reverse;
        }
        self.duty = duty;

        Ok(())
    }

    fn brake(&mut self) -> Result<(), Error> {
        self.service_fault()?;
        if self.is_enabled {
            self.write(1., 1.);
            self.duty = 0.;
            self.direction = Direction::Stopped;
        }
        Ok(())
    }

    fn coast(&mut self) -> Result<(), Error> {
        self.service_fault()?;
        if self.is_enabled {
            self.write(0., 0.);
            self.duty = 0.;
            self.direction = Direction::Stopped;
        }
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Error> {
        self.service_fault()?;
        self.enable.set_high().map_err(|_| Error::Pin)?;
        self.is_enabled = true;
        log::debug!("{}: enabled", self.name);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Error> {
        // Both channels idle before the enable line drops
        self.write(0., 0.);
        self.enable.set_low().map_err(|_| Error::Pin)?;
        self.is_enabled = false;
        self.duty = 0.;
        self.direction = Direction::Stopped;
        log::debug!("{}: disabled", self.name);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.is_enabled
    }
}

/// Scale a duty fraction in [0, 1] to the pin's duty range.
fn scaled_duty<P>(pin: &P, fraction: f64) -> P::Duty
where
    P: PwmPin,
    P::Duty: NumCast + Copy,
{
    let max = pin.get_max_duty();
    let max_f: f64 = NumCast::from(max).unwrap_or(0.);
    NumCast::from(max_f * fraction).unwrap_or(max)
}
