use super::axis::{settled, Axis};
use crate::control::ClosedLoopController;
use crate::hal::{Actuator, PositionSensor};
use crate::scheduler::{Event, Step};
use crate::{Error, SharedChannel};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchConfig {
    /// Encoder position of the horizontal firing attitude.
    pub setpoint: f64,

    pub kp: f64,

    /// Command magnitude under which the axis counts as aligned.
    pub epsilon: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            setpoint: 20_000.,
            kp: 0.06,
            epsilon: 0.001,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchState {
    Init,
    AwaitStart,
    Track,
}

/// Raises the launcher to a fixed attitude and holds it there.
pub struct PitchControl<'a, S, A> {
    axis: Axis<S, A>,
    start: &'a SharedChannel<bool>,
    done: &'a SharedChannel<bool>,
    config: PitchConfig,
    state: PitchState,
    aligned: bool,
}

impl<'a, S, A> PitchControl<'a, S, A>
where
    S: PositionSensor,
    A: Actuator,
{
    pub fn new(
        sensor: S,
        actuator: A,
        start: &'a SharedChannel<bool>,
        done: &'a SharedChannel<bool>,
        config: PitchConfig,
    ) -> Self {
        let controller = ClosedLoopController::new(config.kp, config.setpoint);
        Self {
            axis: Axis::new(sensor, actuator, controller),
            start,
            done,
            config,
            state: PitchState::Init,
            aligned: false,
        }
    }

    pub fn state(&self) -> PitchState {
        self.state
    }

    pub fn position(&self) -> i64 {
        self.axis.sensor.read()
    }

    pub fn actuator(&self) -> &A {
        &self.axis.actuator
    }
}

impl<'a, S, A> Step for PitchControl<'a, S, A>
where
    S: PositionSensor,
    A: Actuator,
{
    fn name(&self) -> &'static str {
        "pitch control"
    }

    fn step(&mut self, _event: Event) -> Result<(), Error> {
        match self.state {
            PitchState::Init => {
                self.axis.actuator.enable()?;
                self.axis.sensor.zero();
                self.done.put(false);
                self.state = PitchState::AwaitStart;
            }
            PitchState::AwaitStart => {
                if self.start.get() {
                    log::info!("pitch control: tracking {}", self.config.setpoint);
                    self.state = PitchState::Track;
                }
            }
            PitchState::Track => {
                let command = self.axis.drive()?;
                if !self.aligned && settled(command, self.config.epsilon) {
                    self.aligned = true;
                    self.done.put(true);
                    log::info!(
                        "pitch control: aligned at {}, {} = true",
                        self.axis.sensor.read(),
                        self.done.name()
                    );
                }
            }
        }

        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        self.axis.actuator.brake()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimAxis;
    use embedded_time::duration::Milliseconds;

    fn tick() -> Event {
        Event {
            now: Milliseconds(0),
            elapsed: Milliseconds(0),
        }
    }

    #[test]
    fn tracks_setpoint_then_reports_done() {
        let axis = SimAxis::new(1. / 0.06);
        let start = SharedChannel::new("start");
        let done = SharedChannel::new("pitch done");
        let config = PitchConfig {
            setpoint: 400.,
            ..PitchConfig::default()
        };
        let mut task =
            PitchControl::new(axis.encoder(), axis.bridge().unwrap(), &start, &done, config);

        for _ in 0..5 {
            task.step(tick()).unwrap();
            axis.advance();
        }
        assert_eq!(task.state(), PitchState::AwaitStart);
        assert!(!done.get());
        assert!(task.actuator().is_enabled());

        start.put(true);
        for _ in 0..100 {
            task.step(tick()).unwrap();
            axis.advance();
        }

        assert!(done.get());
        assert_eq!(task.position(), 400);
        assert_eq!(task.state(), PitchState::Track);
    }

    #[test]
    fn shutdown_brakes() {
        let axis = SimAxis::new(10.);
        let start = SharedChannel::new("start");
        let done = SharedChannel::new("pitch done");
        let mut task = PitchControl::new(
            axis.encoder(),
            axis.bridge().unwrap(),
            &start,
            &done,
            PitchConfig::default(),
        );
        start.put(true);
        task.step(tick()).unwrap();
        task.step(tick()).unwrap();
        task.step(tick()).unwrap();
        assert!(axis.reverse_duty() > 0.);

        task.shutdown().unwrap();
        assert_eq!(axis.forward_duty(), 1.);
        assert_eq!(axis.reverse_duty(), 1.);
    }
}
