//! Cooperative priority scheduler.
//!
//! Every call to [`Scheduler::run`] is one pass: each task whose period has
//! elapsed is stepped exactly once, highest priority first. Because every due
//! task runs in every pass, a busy high priority task delays lower ones by at
//! most one pass and never starves them.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_time::{duration::Milliseconds, Clock};

use crate::Error;

mod task;
pub use task::{Event, Step, Task, TaskConfig, TaskStats};

/// Scheduling table for the five turret tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleTable {
    pub start_trigger: TaskConfig,
    pub thermal_acquire: TaskConfig,
    pub pitch_control: TaskConfig,
    pub yaw_control: TaskConfig,
    pub fire_sequence: TaskConfig,
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self {
            start_trigger: TaskConfig::new(1, 100),
            thermal_acquire: TaskConfig::new(2, 35),
            pitch_control: TaskConfig::new(3, 35),
            yaw_control: TaskConfig::new(4, 35),
            fire_sequence: TaskConfig::new(5, 35),
        }
    }
}

/// Operator stop request, safe to raise from a signal or interrupt handler.
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
}

impl StopSignal {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

pub struct Scheduler<'a, C> {
    tasks: Vec<Task<'a>>,
    clock: C,
    passes: u32,
}

impl<'a, C> Scheduler<'a, C>
where
    C: Clock<T = u32>,
{
    pub fn new(clock: C) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
            passes: 0,
        }
    }

    /// Add a task to the table, keeping the table ordered by descending
    /// priority and then ascending period.
    pub fn add(&mut self, task: Task<'a>) {
        log::debug!(
            "scheduling {} (priority {}, period {} ms)",
            task.name(),
            task.config.priority,
            task.config.period.0
        );
        self.tasks.push(task);
        self.tasks.sort_by(|a, b| {
            b.config
                .priority
                .cmp(&a.config.priority)
                .then(a.config.period.0.cmp(&b.config.period.0))
        });
    }

    /// Builder method to add a task and return `self`
    pub fn with_task(mut self, task: Task<'a>) -> Self {
        self.add(task);
        self
    }

    pub fn tasks(&self) -> &[Task<'a>] {
        &self.tasks
    }

    /// The number of completed passes.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Run one pass over the table, stepping every task that is due.
    pub fn run(&mut self) -> Result<(), Error> {
        let now = self.millis_since_epoch()?.0;

        for task in self.tasks.iter_mut() {
            if let Some(elapsed) = task.ready(now) {
                task.run(now, elapsed)?;
            }
        }

        self.passes = self.passes.wrapping_add(1);
        Ok(())
    }

    /// Run passes until `stop` is raised or a task fails, then shut down
    /// every task.
    ///
    /// Shutdown runs on both paths. A pass error takes precedence over a
    /// shutdown error in the returned result.
    pub fn run_until(&mut self, stop: &StopSignal) -> Result<(), Error> {
        let result = loop {
            if stop.is_raised() {
                log::info!("stop requested after {} passes", self.passes);
                break Ok(());
            }
            if let Err(error) = self.run() {
                log::error!("scheduler pass failed: {}", error);
                break Err(error);
            }
        };

        let finalized = self.shutdown();
        result.and(finalized)
    }

    /// Shut down every task, even when one of them fails.
    /// Returns the first failure.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for task in self.tasks.iter_mut() {
            if let Err(error) = task.step.shutdown() {
                log::error!("{}: shutdown failed: {}", task.step.name(), error);
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        result
    }

    fn millis_since_epoch(&mut self) -> Result<Milliseconds<u32>, Error> {
        let instant = self.clock.try_now()?;
        Milliseconds::try_from(instant.duration_since_epoch()).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimClock;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
        shut_down: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Self {
            Self {
                name,
                log: log.clone(),
                fail: false,
                shut_down: false,
            }
        }
    }

    impl Step for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn step(&mut self, _event: Event) -> Result<(), Error> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(Error::Pin)
            } else {
                Ok(())
            }
        }

        fn shutdown(&mut self) -> Result<(), Error> {
            self.shut_down = true;
            Ok(())
        }
    }

    #[test]
    fn due_tasks_run_in_priority_order() {
        let log = Rc::default();
        let mut low = Recorder::new("low", &log);
        let mut high = Recorder::new("high", &log);
        let mut mid = Recorder::new("mid", &log);

        let clock = SimClock::default();
        let mut scheduler = Scheduler::new(clock.clone())
            .with_task(Task::new(&mut low).with_priority(1))
            .with_task(Task::new(&mut high).with_priority(5))
            .with_task(Task::new(&mut mid).with_priority(3));

        scheduler.run().unwrap();
        assert_eq!(*log.borrow(), ["high", "mid", "low"]);
    }

    #[test]
    fn period_gates_each_task() {
        let log = Rc::default();
        let mut fast = Recorder::new("fast", &log);
        let mut slow = Recorder::new("slow", &log);

        let clock = SimClock::default();
        let mut scheduler = Scheduler::new(clock.clone())
            .with_task(Task::new(&mut fast).with_config(TaskConfig::new(1, 10)))
            .with_task(Task::new(&mut slow).with_config(TaskConfig::new(9, 30)));

        for _ in 0..7 {
            scheduler.run().unwrap();
            clock.advance(5);
        }

        // Passes at 0..=30 ms: fast at 0, 10, 20, 30 and slow at 0, 30
        let fast_runs = log.borrow().iter().filter(|name| **name == "fast").count();
        let slow_runs = log.borrow().iter().filter(|name| **name == "slow").count();
        assert_eq!(fast_runs, 4);
        assert_eq!(slow_runs, 2);
        assert_eq!(scheduler.passes(), 7);
    }

    #[test]
    fn low_priority_task_is_not_starved() {
        let log = Rc::default();
        let mut busy = Recorder::new("busy", &log);
        let mut idle = Recorder::new("idle", &log);

        let clock = SimClock::default();
        let mut scheduler = Scheduler::new(clock.clone())
            .with_task(Task::new(&mut busy).with_priority(200))
            .with_task(Task::new(&mut idle).with_priority(0));

        for _ in 0..5 {
            scheduler.run().unwrap();
            clock.advance(1);
        }

        let idle_runs = log.borrow().iter().filter(|name| **name == "idle").count();
        assert_eq!(idle_runs, 5);
        assert!(scheduler.tasks().iter().all(|task| task.stats.runs == 5));
    }

    #[test]
    fn stop_signal_shuts_down_every_task() {
        let log = Rc::default();
        let mut a = Recorder::new("a", &log);
        let mut b = Recorder::new("b", &log);
        let stop = StopSignal::new();
        stop.raise();

        {
            let mut scheduler = Scheduler::new(SimClock::default())
                .with_task(Task::new(&mut a))
                .with_task(Task::new(&mut b));
            scheduler.run_until(&stop).unwrap();
        }

        assert!(log.borrow().is_empty());
        assert!(a.shut_down && b.shut_down);
    }

    #[test]
    fn failed_pass_still_shuts_down() {
        let log = Rc::default();
        let mut ok = Recorder::new("ok", &log);
        let mut broken = Recorder::new("broken", &log);
        broken.fail = true;
        let stop = StopSignal::new();

        {
            let mut scheduler = Scheduler::new(SimClock::default())
                .with_task(Task::new(&mut ok))
                .with_task(Task::new(&mut broken));
            assert!(matches!(scheduler.run_until(&stop), Err(Error::Pin)));
        }

        assert!(ok.shut_down && broken.shut_down);
    }

    #[test]
    fn default_table_prints_every_task() {
        let table = ScheduleTable::default();
        assert_eq!(table.thermal_acquire, TaskConfig::new(2, 35));
        assert_eq!(
            table,
            ScheduleTable {
                start_trigger: TaskConfig::new(1, 100),
                ..table
            }
        );

        let printed = format!("{:?}", table);
        for name in [
            "start_trigger",
            "thermal_acquire",
            "pitch_control",
            "yaw_control",
            "fire_sequence",
        ] {
            assert!(printed.contains(name));
        }
    }
}
