use super::axis::{settled, Axis};
use crate::control::ClosedLoopController;
use crate::hal::{Actuator, PositionSensor};
use crate::scheduler::{Event, Step};
use crate::targeting::TargetEstimate;
use crate::{Error, SharedChannel};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YawConfig {
    /// Encoder position of the homing reference.
    pub home_setpoint: f64,

    pub kp: f64,

    /// Command magnitude under which the axis counts as settled.
    pub epsilon: f64,

    /// Encoder counts per radian of target angle.
    pub counts_per_radian: f64,
}

impl Default for YawConfig {
    fn default() -> Self {
        Self {
            home_setpoint: 20_000.,
            kp: 0.06,
            epsilon: 0.005,
            counts_per_radian: 20.,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YawState {
    Init,
    AwaitStart,
    Home,
    AwaitTarget,
    Track,
}

/// Homes the turret, then turns it toward the published target angle.
pub struct YawControl<'a, S, A> {
    axis: Axis<S, A>,
    start: &'a SharedChannel<bool>,
    target: &'a SharedChannel<TargetEstimate>,
    done: &'a SharedChannel<bool>,
    config: YawConfig,
    state: YawState,
    aligned: bool,
}

impl<'a, S, A> YawControl<'a, S, A>
where
    S: PositionSensor,
    A: Actuator,
{
    pub fn new(
        sensor: S,
        actuator: A,
        start: &'a SharedChannel<bool>,
        target: &'a SharedChannel<TargetEstimate>,
        done: &'a SharedChannel<bool>,
        config: YawConfig,
    ) -> Self {
        let controller = ClosedLoopController::new(config.kp, config.home_setpoint);
        Self {
            axis: Axis::new(sensor, actuator, controller),
            start,
            target,
            done,
            config,
            state: YawState::Init,
            aligned: false,
        }
    }

    pub fn state(&self) -> YawState {
        self.state
    }

    pub fn controller(&self) -> &ClosedLoopController {
        &self.axis.controller
    }

    pub fn position(&self) -> i64 {
        self.axis.sensor.read()
    }

    pub fn actuator(&self) -> &A {
        &self.axis.actuator
    }
}

impl<'a, S, A> Step for YawControl<'a, S, A>
where
    S: PositionSensor,
    A: Actuator,
{
    fn name(&self) -> &'static str {
        "yaw control"
    }

    fn step(&mut self, _event: Event) -> Result<(), Error> {
        match self.state {
            YawState::Init => {
                self.axis.actuator.enable()?;
                self.axis.sensor.zero();
                self.done.put(false);
                self.state = YawState::AwaitStart;
            }
            YawState::AwaitStart => {
                if self.start.get() {
                    log::info!("yaw control: homing to {}", self.config.home_setpoint);
                    self.state = YawState::Home;
                }
            }
            YawState::Home => {
                let command = self.axis.command();
                if settled(command, self.config.epsilon) {
                    self.axis.actuator.set_command(0.)?;
                    self.axis.sensor.zero();
                    log::info!("yaw control: homed, position zeroed");
                    self.state = YawState::AwaitTarget;
                } else {
                    self.axis.actuator.set_command(command)?;
                }
            }
            YawState::AwaitTarget => {
                let estimate = self.target.get();
                // The default estimate is invalid, so an unwritten channel never passes
                if estimate.valid && estimate != TargetEstimate::default() {
                    let setpoint = estimate.angle_radians * self.config.counts_per_radian;
                    self.axis.controller.set_setpoint(setpoint);
                    log::info!(
                        "yaw control: target {:.3} rad, tracking {}",
                        estimate.angle_radians,
                        setpoint
                    );
                    self.state = YawState::Track;
                }
            }
            YawState::Track => {
                let command = self.axis.drive()?;
                if !self.aligned && settled(command, self.config.epsilon) {
                    self.aligned = true;
                    self.done.put(true);
                    log::info!(
                        "yaw control: aligned at {}, {} = true",
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
    use approx::assert_abs_diff_eq;
    use embedded_time::duration::Milliseconds;

    fn tick() -> Event {
        Event {
            now: Milliseconds(0),
            elapsed: Milliseconds(0),
        }
    }

    fn config() -> YawConfig {
        YawConfig {
            home_setpoint: 300.,
            ..YawConfig::default()
        }
    }

    fn run(task: &mut impl Step, axis: &SimAxis, steps: usize) {
        for _ in 0..steps {
            task.step(tick()).unwrap();
            axis.advance();
        }
    }

    #[test]
    fn homes_then_zeroes() {
        let axis = SimAxis::new(1. / 0.06);
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("yaw angle");
        let done = SharedChannel::new("yaw done");
        let mut task = YawControl::new(
            axis.encoder(),
            axis.bridge().unwrap(),
            &start,
            &target,
            &done,
            config(),
        );
        start.put(true);

        run(&mut task, &axis, 40);

        assert_eq!(task.state(), YawState::AwaitTarget);
        assert_eq!(task.position(), 0);
        assert_eq!(axis.count(), 300);
        assert!(!done.get());
    }

    #[test]
    fn invalid_estimate_keeps_waiting() {
        let axis = SimAxis::new(1. / 0.06);
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("yaw angle");
        let done = SharedChannel::new("yaw done");
        let mut task = YawControl::new(
            axis.encoder(),
            axis.bridge().unwrap(),
            &start,
            &target,
            &done,
            config(),
        );
        start.put(true);
        run(&mut task, &axis, 40);

        target.put(TargetEstimate {
            angle_radians: 0.3,
            valid: false,
        });
        run(&mut task, &axis, 10);
        assert_eq!(task.state(), YawState::AwaitTarget);
    }

    #[test]
    fn converges_on_published_angle() {
        let axis = SimAxis::new(1. / 0.06);
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("yaw angle");
        let done = SharedChannel::new("yaw done");
        let mut task = YawControl::new(
            axis.encoder(),
            axis.bridge().unwrap(),
            &start,
            &target,
            &done,
            config(),
        );
        start.put(true);
        run(&mut task, &axis, 40);

        target.put(TargetEstimate::new(0.2));
        run(&mut task, &axis, 1);
        assert_eq!(task.state(), YawState::Track);
        assert_abs_diff_eq!(task.controller().setpoint, 4., epsilon = 1e-12);

        run(&mut task, &axis, 5);
        assert!(done.get());
        assert_eq!(task.position(), 4);
    }
}
