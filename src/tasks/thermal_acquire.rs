use crate::hal::{ThermalCamera, ThermalFrame};
use crate::scheduler::{Event, Step};
use crate::targeting::{TargetEstimate, ThermalTargetingEngine};
use crate::{Error, SharedChannel};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcquireConfig {
    /// Steps to wait after `start` before each capture.
    pub pre_round_ticks: u16,

    pub engine: ThermalTargetingEngine,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            pre_round_ticks: 142,
            engine: ThermalTargetingEngine::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireState {
    Init,
    AwaitStart,
    PreRoundDelay { remaining: u16 },
    CaptureFrame,
    Analyze,
}

/// Captures thermal frames and publishes a fresh target estimate every round.
pub struct ThermalAcquire<'a, C> {
    camera: C,
    start: &'a SharedChannel<bool>,
    target: &'a SharedChannel<TargetEstimate>,
    config: AcquireConfig,
    state: AcquireState,
    frame: Option<ThermalFrame>,
    rounds: u32,
}

impl<'a, C> ThermalAcquire<'a, C>
where
    C: ThermalCamera,
{
    pub fn new(
        camera: C,
        start: &'a SharedChannel<bool>,
        target: &'a SharedChannel<TargetEstimate>,
        config: AcquireConfig,
    ) -> Self {
        Self {
            camera,
            start,
            target,
            config,
            state: AcquireState::Init,
            frame: None,
            rounds: 0,
        }
    }

    pub fn state(&self) -> AcquireState {
        self.state
    }

    /// The number of estimates published so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

impl<'a, C> Step for ThermalAcquire<'a, C>
where
    C: ThermalCamera,
{
    fn name(&self) -> &'static str {
        "thermal acquire"
    }

    fn step(&mut self, _event: Event) -> Result<(), Error> {
        self.state = match self.state {
            AcquireState::Init => match self.camera.init() {
                Ok(()) => AcquireState::AwaitStart,
                Err(error) => {
                    log::warn!("thermal acquire: camera init failed: {}", error);
                    AcquireState::Init
                }
            },
            AcquireState::AwaitStart => {
                if self.start.get() {
                    AcquireState::PreRoundDelay {
                        remaining: self.config.pre_round_ticks,
                    }
                } else {
                    AcquireState::AwaitStart
                }
            }
            AcquireState::PreRoundDelay { remaining: 0 } => AcquireState::CaptureFrame,
            AcquireState::PreRoundDelay { remaining } => AcquireState::PreRoundDelay {
                remaining: remaining - 1,
            },
            AcquireState::CaptureFrame => match self.camera.capture() {
                Ok(frame) => {
                    self.frame = Some(frame);
                    AcquireState::Analyze
                }
                Err(error) => {
                    log::warn!("thermal acquire: capture failed: {}", error);
                    AcquireState::CaptureFrame
                }
            },
            AcquireState::Analyze => {
                if let Some(frame) = self.frame.take() {
                    let estimate = self.config.engine.estimate(&frame);
                    self.target.put(estimate);
                    self.rounds += 1;

                    if estimate.valid {
                        log::info!(
                            "thermal acquire: round {} target at {:.3} rad",
                            self.rounds,
                            estimate.angle_radians
                        );
                    } else {
                        log::info!("thermal acquire: round {} found no target", self.rounds);
                    }
                }
                AcquireState::AwaitStart
            }
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ScheduleTable;
    use crate::sim::SimCamera;
    use approx::assert_abs_diff_eq;
    use embedded_time::duration::Milliseconds;

    fn tick() -> Event {
        Event {
            now: Milliseconds(0),
            elapsed: Milliseconds(0),
        }
    }

    fn config() -> AcquireConfig {
        AcquireConfig {
            pre_round_ticks: 2,
            ..AcquireConfig::default()
        }
    }

    #[test]
    fn waits_for_start() {
        let camera = SimCamera::new(32, 24);
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("target");
        let mut task = ThermalAcquire::new(camera.clone(), &start, &target, config());

        for _ in 0..10 {
            task.step(tick()).unwrap();
        }
        assert_eq!(task.state(), AcquireState::AwaitStart);
        assert_eq!(camera.captures(), 0);
    }

    #[test]
    fn publishes_a_fresh_estimate_every_round() {
        let camera = SimCamera::new(32, 24);
        camera.set_target_row(Some(0));
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("target");
        let mut task = ThermalAcquire::new(camera.clone(), &start, &target, config());
        start.put(true);

        // Init, AwaitStart, delay 2, 1, 0, capture, analyze
        for _ in 0..7 {
            task.step(tick()).unwrap();
        }
        assert_eq!(task.rounds(), 1);
        let first = target.get();
        assert!(first.valid);
        assert_abs_diff_eq!(first.angle_radians, (6.0f64).atan(), epsilon = 1e-12);
        assert_eq!(task.state(), AcquireState::AwaitStart);

        camera.set_target_row(None);
        for _ in 0..6 {
            task.step(tick()).unwrap();
        }
        assert_eq!(task.rounds(), 2);
        assert_eq!(camera.captures(), 2);
        assert!(!target.get().valid);
    }

    #[test]
    fn capture_failure_retries() {
        let camera = SimCamera::new(32, 24);
        camera.set_target_row(Some(12));
        camera.fail_next(2);
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("target");
        let mut task = ThermalAcquire::new(camera.clone(), &start, &target, config());
        start.put(true);

        for _ in 0..6 {
            task.step(tick()).unwrap();
        }
        assert_eq!(task.state(), AcquireState::CaptureFrame);

        for _ in 0..3 {
            task.step(tick()).unwrap();
        }
        assert_eq!(task.rounds(), 1);
        assert!(target.get().valid);
    }

    #[test]
    fn default_delay_spans_five_seconds() {
        let camera = SimCamera::new(32, 24);
        let start = SharedChannel::new("start");
        let target = SharedChannel::new("target");
        let mut task = ThermalAcquire::new(camera, &start, &target, AcquireConfig::default());
        start.put(true);

        // Init, AwaitStart
        task.step(tick()).unwrap();
        task.step(tick()).unwrap();

        let mut delay_steps = 0u32;
        while matches!(task.state(), AcquireState::PreRoundDelay { .. }) {
            task.step(tick()).unwrap();
            delay_steps += 1;
        }
        assert_eq!(task.state(), AcquireState::CaptureFrame);

        let period = ScheduleTable::default().thermal_acquire.period.0;
        assert!((delay_steps * period).abs_diff(5_000) < period);
    }
}
