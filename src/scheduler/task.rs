use embedded_time::duration::Milliseconds;

use crate::Error;

/// An event containing the current time for a task step.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    /// The current time in milliseconds.
    pub now: Milliseconds<u32>,

    /// The time since this task last ran (in milliseconds).
    pub elapsed: Milliseconds<u32>,
}

/// A cooperative task advanced one state transition at a time.
///
/// `step` must return promptly. Any wait is expressed as a state that is
/// re-evaluated on the next call, never as a blocking loop.
pub trait Step {
    /// A short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Evaluate one state transition.
    fn step(&mut self, event: Event) -> Result<(), Error>;

    /// Put any hardware owned by this task into a safe state.
    /// Called once when the scheduler stops.
    fn shutdown(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Scheduling parameters for one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskConfig {
    /// Higher priorities run first among tasks due in the same pass.
    pub priority: u8,

    /// The minimum time between two runs of the task.
    pub period: Milliseconds<u32>,
}

impl TaskConfig {
    pub const fn new(priority: u8, period_ms: u32) -> Self {
        Self {
            priority,
            period: Milliseconds(period_ms),
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Run statistics for a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Number of completed steps.
    pub runs: u32,

    /// Number of steps that ran at least two periods after the previous one.
    pub slips: u32,
}

/// A task to run with a priority and period
pub struct Task<'a> {
    /// The state machine to step.
    pub step: &'a mut dyn Step,

    pub config: TaskConfig,

    /// The time (in milliseconds) this task last ran.
    pub last_run: Option<u32>,

    pub stats: TaskStats,
}

impl<'a> Task<'a> {
    /// Create a new task that runs on every scheduler pass.
    pub fn new(step: &'a mut dyn Step) -> Self {
        Self {
            step,
            config: TaskConfig::default(),
            last_run: None,
            stats: TaskStats::default(),
        }
    }

    /// Builder method to set the whole `config` and return `self`
    pub fn with_config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method to set `priority` and return `self`
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.config.priority = priority;
        self
    }

    /// Builder method to set `period` and return `self`
    pub fn with_period(mut self, period: Milliseconds<u32>) -> Self {
        self.config.period = period;
        self
    }

    pub fn name(&self) -> &'static str {
        self.step.name()
    }

    /// If this task is due returns the time elapsed since the last run.
    /// Otherwise this returns `None`.
    pub fn ready(&self, now: u32) -> Option<u32> {
        match self.last_run {
            None => Some(0),
            Some(last_run) => {
                let dt = now.wrapping_sub(last_run);
                if dt >= self.config.period.0 {
                    Some(dt)
                } else {
                    None
                }
            }
        }
    }

    /// Run this task at the current time.
    pub fn run(&mut self, now: u32, elapsed: u32) -> Result<(), Error> {
        let period = self.config.period.0;
        if self.last_run.is_some() && period > 0 && elapsed >= period.saturating_mul(2) {
            self.stats.slips += 1;
            log::debug!(
                "{}: ran {} ms after last run (period {} ms)",
                self.name(),
                elapsed,
                period
            );
        }

        self.step.step(Event {
            now: Milliseconds(now),
            elapsed: Milliseconds(elapsed),
        })?;

        // Record when we ran
        // This determines when we next run the task
        self.last_run = Some(now);
        self.stats.runs += 1;

        Ok(())
    }
}
