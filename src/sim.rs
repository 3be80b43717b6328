//! Simulated turret hardware for host runs and tests.
//!
//! Every handle is a cheap clone over shared state, so a test can keep one
//! copy to stimulate or inspect while the task owns another.

use alloc::rc::Rc;
use core::cell::Cell;
use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::{Direction as CountDirection, PwmPin, Qei};
use embedded_time::{clock, fraction::Fraction, Clock, Instant};
use num_traits::Float;

use crate::hal::{Encoder, HBridge, ThermalCamera, ThermalFrame};
use crate::Error;

/// A millisecond clock that only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    millis: Rc<Cell<u32>>,
}

impl SimClock {
    pub fn advance(&self, millis: u32) {
        self.millis.set(self.millis.get().wrapping_add(millis));
    }

    pub fn millis(&self) -> u32 {
        self.millis.get()
    }
}

impl Clock for SimClock {
    type T = u32;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        Ok(Instant::new(self.millis.get()))
    }
}

/// A digital line usable as either an input or an output.
#[derive(Clone, Debug, Default)]
pub struct SimLine {
    level: Rc<Cell<bool>>,
}

impl SimLine {
    /// Drive the line from outside, like a switch would.
    pub fn set(&self, high: bool) {
        self.level.set(high);
    }

    pub fn is_set(&self) -> bool {
        self.level.get()
    }
}

impl InputPin for SimLine {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

impl OutputPin for SimLine {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.level.set(true);
        Ok(())
    }
}

/// A PWM channel with a duty range of [0, 1].
#[derive(Clone, Debug, Default)]
pub struct SimPwm {
    duty: Rc<Cell<f32>>,
}

impl PwmPin for SimPwm {
    type Duty = f32;

    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> f32 {
        self.duty.get()
    }

    fn get_max_duty(&self) -> f32 {
        1.
    }

    fn set_duty(&mut self, duty: f32) {
        self.duty.set(duty);
    }
}

/// A 16-bit quadrature counter following a simulated shaft.
#[derive(Clone, Debug)]
pub struct SimQei {
    position: Rc<Cell<f64>>,
}

impl Qei for SimQei {
    type Count = u16;

    fn count(&self) -> u16 {
        let counts = Float::round(self.position.get()) as i64;
        counts.rem_euclid(1 << 16) as u16
    }

    fn direction(&self) -> CountDirection {
        CountDirection::Upcounting
    }
}

/// The H-bridge driver type wired up by [`SimAxis::bridge`].
pub type SimBridge = HBridge<'static, SimPwm, SimPwm, SimLine>;

/// A motor, gearbox and encoder reduced to a first order plant.
///
/// Each [`advance`](SimAxis::advance) moves the shaft by the net duty times
/// `counts_per_tick`. The reverse channel counts up, so a negative command
/// raises the encoder count. Brake (both channels at max) holds the shaft.
#[derive(Clone, Debug)]
pub struct SimAxis {
    position: Rc<Cell<f64>>,
    forward: SimPwm,
    reverse: SimPwm,
    enable: SimLine,
    counts_per_tick: f64,
}

impl SimAxis {
    /// Create a stationary axis that moves `counts_per_tick` counts per
    /// step at full duty.
    pub fn new(counts_per_tick: f64) -> Self {
        Self {
            position: Rc::default(),
            forward: SimPwm::default(),
            reverse: SimPwm::default(),
            enable: SimLine::default(),
            counts_per_tick,
        }
    }

    pub fn encoder(&self) -> Encoder<SimQei> {
        Encoder::sixteen_bit(SimQei {
            position: self.position.clone(),
        })
    }

    pub fn bridge(&self) -> Result<SimBridge, Error> {
        HBridge::new(
            self.forward.clone(),
            self.reverse.clone(),
            self.enable.clone(),
        )
    }

    /// Integrate one step of motion.
    pub fn advance(&self) {
        if !self.enable.is_set() {
            return;
        }
        let drive = f64::from(self.reverse_duty() - self.forward_duty());
        self.position
            .set(self.position.get() + drive * self.counts_per_tick);
    }

    /// Shaft position (in counts, unwrapped).
    pub fn position(&self) -> f64 {
        self.position.get()
    }

    /// The raw 16-bit counter value.
    pub fn count(&self) -> u16 {
        SimQei {
            position: self.position.clone(),
        }
        .count()
    }

    pub fn forward_duty(&self) -> f32 {
        self.forward.get_duty()
    }

    pub fn reverse_duty(&self) -> f32 {
        self.reverse.get_duty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enable.is_set()
    }
}

#[derive(Debug)]
struct CameraState {
    width: usize,
    height: usize,
    target_row: Cell<Option<usize>>,
    captures: Cell<u32>,
    failures: Cell<u32>,
}

/// A thermal camera looking at a room temperature scene with an optional
/// hot stripe across one row.
#[derive(Clone, Debug)]
pub struct SimCamera {
    state: Rc<CameraState>,
}

impl SimCamera {
    pub const AMBIENT: f32 = 20.;
    pub const HOT: f32 = 300.;

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            state: Rc::new(CameraState {
                width,
                height,
                target_row: Cell::new(None),
                captures: Cell::new(0),
                failures: Cell::new(0),
            }),
        }
    }

    /// Place the target on `row`, or remove it with `None`.
    pub fn set_target_row(&self, row: Option<usize>) {
        self.state.target_row.set(row);
    }

    /// Make the next `count` captures fail.
    pub fn fail_next(&self, count: u32) {
        self.state.failures.set(count);
    }

    /// The number of frames delivered so far.
    pub fn captures(&self) -> u32 {
        self.state.captures.get()
    }
}

impl ThermalCamera for SimCamera {
    fn capture(&mut self) -> Result<ThermalFrame, Error> {
        let failures = self.state.failures.get();
        if failures > 0 {
            self.state.failures.set(failures - 1);
            return Err(Error::Camera);
        }

        let target = self.state.target_row.get();
        let frame = ThermalFrame::from_fn(self.state.width, self.state.height, |row, _| {
            if Some(row) == target {
                Self::HOT
            } else {
                Self::AMBIENT
            }
        });
        self.state.captures.set(self.captures() + 1);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Actuator, PositionSensor};
    use embedded_time::duration::Milliseconds;

    #[test]
    fn clock_reports_advanced_millis() {
        let clock = SimClock::default();
        clock.advance(250);
        clock.clone().advance(10);

        let now = clock.try_now().unwrap();
        let millis = Milliseconds::<u32>::try_from(now.duration_since_epoch()).unwrap();
        assert_eq!(millis.0, 260);
    }

    #[test]
    fn axis_counts_up_in_reverse_and_holds_on_brake() {
        let axis = SimAxis::new(100.);
        let mut encoder = axis.encoder();
        let mut bridge = axis.bridge().unwrap();

        // Disabled: no motion
        bridge.set_command(-0.5).unwrap();
        axis.advance();
        assert_eq!(axis.position(), 0.);

        bridge.enable().unwrap();
        bridge.set_command(-0.5).unwrap();
        axis.advance();
        encoder.update();
        assert_eq!(encoder.read(), 50);

        bridge.set_command(0.).unwrap();
        axis.advance();
        encoder.update();
        assert_eq!(encoder.read(), 50);

        bridge.set_command(1.).unwrap();
        axis.advance();
        encoder.update();
        assert_eq!(encoder.read(), -50);
        assert_eq!(axis.count(), 65_486);
    }

    #[test]
    fn camera_stripe_and_failures() {
        let mut camera = SimCamera::new(4, 3);
        camera.set_target_row(Some(1));
        camera.fail_next(1);

        assert!(matches!(camera.capture(), Err(Error::Camera)));
        let frame = camera.capture().unwrap();
        assert_eq!(frame.pixels()[(1, 3)], SimCamera::HOT);
        assert_eq!(frame.pixels()[(2, 0)], SimCamera::AMBIENT);
        assert_eq!(camera.captures(), 1);
    }
}
