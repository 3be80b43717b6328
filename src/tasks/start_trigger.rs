use embedded_hal::digital::v2::InputPin;

use crate::scheduler::{Event, Step};
use crate::{Error, SharedChannel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Steps to wait between seeing the trigger and re-checking it.
    pub debounce_ticks: u16,

    /// Treat a low line as pressed.
    pub active_low: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            debounce_ticks: 10,
            active_low: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartState {
    Init,
    /// Waiting for the trigger, or counting down before the re-check.
    ArmDebounce { remaining: Option<u16> },
    /// `start` has been published. Sink state.
    Confirmed,
}

/// Watches the start trigger and publishes `start = true` once.
pub struct StartTrigger<'a, P> {
    pin: P,
    start: &'a SharedChannel<bool>,
    config: TriggerConfig,
    state: StartState,
}

impl<'a, P> StartTrigger<'a, P>
where
    P: InputPin,
{
    pub fn new(pin: P, start: &'a SharedChannel<bool>, config: TriggerConfig) -> Self {
        Self {
            pin,
            start,
            config,
            state: StartState::Init,
        }
    }

    pub fn state(&self) -> StartState {
        self.state
    }

    /// A failed read counts as released.
    fn is_pressed(&self) -> bool {
        let level = if self.config.active_low {
            self.pin.is_low()
        } else {
            self.pin.is_high()
        };

        level.unwrap_or_else(|_| {
            log::warn!("start trigger: read failed");
            false
        })
    }
}

impl<'a, P> Step for StartTrigger<'a, P>
where
    P: InputPin,
{
    fn name(&self) -> &'static str {
        "start trigger"
    }

    fn step(&mut self, _event: Event) -> Result<(), Error> {
        self.state = match self.state {
            StartState::Init => StartState::ArmDebounce { remaining: None },
            StartState::ArmDebounce { remaining: None } => {
                if self.is_pressed() {
                    log::debug!("start trigger: pressed, debouncing");
                    StartState::ArmDebounce {
                        remaining: Some(self.config.debounce_ticks),
                    }
                } else {
                    self.state
                }
            }
            StartState::ArmDebounce { remaining: Some(0) } => {
                if self.is_pressed() {
                    self.start.put(true);
                    log::info!("start trigger: confirmed, {} = true", self.start.name());
                    StartState::Confirmed
                } else {
                    log::debug!("start trigger: released during debounce");
                    StartState::ArmDebounce { remaining: None }
                }
            }
            StartState::ArmDebounce {
                remaining: Some(ticks),
            } => StartState::ArmDebounce {
                remaining: Some(ticks - 1),
            },
            StartState::Confirmed => StartState::Confirmed,
        };

        Ok(())
    }
}
