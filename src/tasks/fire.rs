use embedded_hal::digital::v2::OutputPin;

use crate::scheduler::{Event, Step};
use crate::{Error, SharedChannel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FireConfig {
    /// Steps the flywheels spin before the first shot.
    pub spin_up_ticks: u16,

    /// Plunger strokes per sequence.
    pub shots: u8,

    pub plunger_on_ticks: u16,
    pub plunger_off_ticks: u16,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            spin_up_ticks: 30,
            shots: 2,
            plunger_on_ticks: 6,
            plunger_off_ticks: 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirePhase {
    SpinUp { remaining: u16 },
    PlungerOn { shot: u8, remaining: u16 },
    PlungerOff { shot: u8, remaining: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireState {
    Init,
    AwaitStart,
    AwaitAligned,
    Fire(FirePhase),
    Spent,
}

/// Fires the launcher once both axes report alignment.
pub struct FireSequence<'a, F, P> {
    flywheel: F,
    plunger: P,
    start: &'a SharedChannel<bool>,
    pitch_done: &'a SharedChannel<bool>,
    yaw_done: &'a SharedChannel<bool>,
    config: FireConfig,
    state: FireState,
    shots_fired: u8,
}

impl<'a, F, P> FireSequence<'a, F, P>
where
    F: OutputPin,
    P: OutputPin,
{
    pub fn new(
        flywheel: F,
        plunger: P,
        start: &'a SharedChannel<bool>,
        pitch_done: &'a SharedChannel<bool>,
        yaw_done: &'a SharedChannel<bool>,
        config: FireConfig,
    ) -> Self {
        Self {
            flywheel,
            plunger,
            start,
            pitch_done,
            yaw_done,
            config,
            state: FireState::Init,
            shots_fired: 0,
        }
    }

    pub fn state(&self) -> FireState {
        self.state
    }

    pub fn shots_fired(&self) -> u8 {
        self.shots_fired
    }

    fn set_flywheel(&mut self, on: bool) -> Result<(), Error> {
        let result = if on {
            self.flywheel.set_high()
        } else {
            self.flywheel.set_low()
        };
        result.map_err(|_| Error::Pin)
    }

    fn set_plunger(&mut self, on: bool) -> Result<(), Error> {
        let result = if on {
            self.plunger.set_high()
        } else {
            self.plunger.set_low()
        };
        result.map_err(|_| Error::Pin)
    }

    fn fire(&mut self, phase: FirePhase) -> Result<FireState, Error> {
        let next = match phase {
            FirePhase::SpinUp { remaining: 0 } => {
                self.set_plunger(true)?;
                FirePhase::PlungerOn {
                    shot: 1,
                    remaining: self.config.plunger_on_ticks,
                }
            }
            FirePhase::SpinUp { remaining } => FirePhase::SpinUp {
                remaining: remaining - 1,
            },
            FirePhase::PlungerOn { shot, remaining: 0 } => {
                self.set_plunger(false)?;
                self.shots_fired += 1;
                log::info!("fire sequence: shot {} of {}", shot, self.config.shots);
                FirePhase::PlungerOff {
                    shot,
                    remaining: self.config.plunger_off_ticks,
                }
            }
            FirePhase::PlungerOn { shot, remaining } => FirePhase::PlungerOn {
                shot,
                remaining: remaining - 1,
            },
            FirePhase::PlungerOff { shot, remaining: 0 } => {
                if shot >= self.config.shots {
                    self.set_flywheel(false)?;
                    log::info!("fire sequence: spent after {} shots", self.shots_fired);
                    return Ok(FireState::Spent);
                }
                self.set_plunger(true)?;
                FirePhase::PlungerOn {
                    shot: shot + 1,
                    remaining: self.config.plunger_on_ticks,
                }
            }
            FirePhase::PlungerOff { shot, remaining } => FirePhase::PlungerOff {
                shot,
                remaining: remaining - 1,
            },
        };

        Ok(FireState::Fire(next))
    }
}

impl<'a, F, P> Step for FireSequence<'a, F, P>
where
    F: OutputPin,
    P: OutputPin,
{
    fn name(&self) -> &'static str {
        "fire sequence"
    }

    fn step(&mut self, _event: Event) -> Result<(), Error> {
        self.state = match self.state {
            FireState::Init => {
                self.set_flywheel(false)?;
                self.set_plunger(false)?;
                FireState::AwaitStart
            }
            FireState::AwaitStart => {
                if self.start.get() {
                    FireState::AwaitAligned
                } else {
                    FireState::AwaitStart
                }
            }
            FireState::AwaitAligned => {
                if self.pitch_done.get() && self.yaw_done.get() {
                    if self.config.shots == 0 {
                        FireState::Spent
                    } else {
                        self.set_flywheel(true)?;
                        log::info!("fire sequence: aligned, spinning up");
                        FireState::Fire(FirePhase::SpinUp {
                            remaining: self.config.spin_up_ticks,
                        })
                    }
                } else {
                    FireState::AwaitAligned
                }
            }
            FireState::Fire(phase) => self.fire(phase)?,
            FireState::Spent => FireState::Spent,
        };

        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        let plunger = self.set_plunger(false);
        self.set_flywheel(false)?;
        plunger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimLine;
    use embedded_time::duration::Milliseconds;

    fn tick() -> Event {
        Event {
            now: Milliseconds(0),
            elapsed: Milliseconds(0),
        }
    }

    fn config() -> FireConfig {
        FireConfig {
            spin_up_ticks: 2,
            shots: 2,
            plunger_on_ticks: 1,
            plunger_off_ticks: 1,
        }
    }

    #[test]
    fn holds_until_both_axes_align() {
        let flywheel = SimLine::default();
        let plunger = SimLine::default();
        let start = SharedChannel::new("start");
        let pitch_done = SharedChannel::new("pitch done");
        let yaw_done = SharedChannel::new("yaw done");
        let mut task = FireSequence::new(
            flywheel.clone(),
            plunger.clone(),
            &start,
            &pitch_done,
            &yaw_done,
            config(),
        );
        start.put(true);

        for done in [(false, false), (true, false), (false, true)] {
            pitch_done.put(done.0);
            yaw_done.put(done.1);
            for _ in 0..10 {
                task.step(tick()).unwrap();
                assert!(!matches!(task.state(), FireState::Fire(_)));
            }
        }
        assert_eq!(task.state(), FireState::AwaitAligned);
        assert!(!flywheel.is_set());
        assert!(!plunger.is_set());

        pitch_done.put(true);
        yaw_done.put(true);
        task.step(tick()).unwrap();
        assert_eq!(
            task.state(),
            FireState::Fire(FirePhase::SpinUp { remaining: 2 })
        );
        assert!(flywheel.is_set());
    }

    #[test]
    fn fires_configured_shots_then_stops() {
        let flywheel = SimLine::default();
        let plunger = SimLine::default();
        let start = SharedChannel::new("start");
        let pitch_done = SharedChannel::new("pitch done");
        let yaw_done = SharedChannel::new("yaw done");
        let mut task = FireSequence::new(
            flywheel.clone(),
            plunger.clone(),
            &start,
            &pitch_done,
            &yaw_done,
            config(),
        );
        start.put(true);
        pitch_done.put(true);
        yaw_done.put(true);

        let mut plunger_edges = 0;
        let mut last = false;
        for _ in 0..30 {
            task.step(tick()).unwrap();
            if plunger.is_set() && !last {
                plunger_edges += 1;
            }
            last = plunger.is_set();
        }

        assert_eq!(task.state(), FireState::Spent);
        assert_eq!(task.shots_fired(), 2);
        assert_eq!(plunger_edges, 2);
        assert!(!flywheel.is_set());
        assert!(!plunger.is_set());
    }

    #[test]
    fn shutdown_releases_outputs() {
        let flywheel = SimLine::default();
        let plunger = SimLine::default();
        let start = SharedChannel::new("start");
        let pitch_done = SharedChannel::new("pitch done");
        let yaw_done = SharedChannel::new("yaw done");
        let mut task = FireSequence::new(
            flywheel.clone(),
            plunger.clone(),
            &start,
            &pitch_done,
            &yaw_done,
            config(),
        );
        start.put(true);
        pitch_done.put(true);
        yaw_done.put(true);

        // Init, AwaitStart, AwaitAligned, spin up 2, 1, 0
        for _ in 0..6 {
            task.step(tick()).unwrap();
        }
        assert!(flywheel.is_set());
        assert!(plunger.is_set());

        task.shutdown().unwrap();
        assert!(!flywheel.is_set());
        assert!(!plunger.is_set());
    }
}
