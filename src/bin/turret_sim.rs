//! Runs the whole turret on simulated hardware.
//!
//! The trigger is pressed at startup and the run ends once the launcher is
//! spent, the simulated time limit passes, or Ctrl+C is pressed. Every
//! actuator is braked on the way out.
//!
//! Usage:
//!   cargo run --bin turret-sim -- [OPTIONS]
//!
//! Options:
//!   --limit <SECONDS>   Simulated time limit (default: 120)
//!   --row <ROW>         Frame row holding the hot target (default: 6)
//!   --speed <N>         Simulated milliseconds per wall clock millisecond (default: 5)
//!
//! Set `RUST_LOG` to change the log level (default: info).

use std::env;
use std::process;
use std::time::Duration;

use thermal_turret::scheduler::{ScheduleTable, Scheduler, Task, TaskConfig};
use thermal_turret::sim::{SimAxis, SimCamera, SimClock, SimLine};
use thermal_turret::tasks::{
    AcquireConfig, FireConfig, FireSequence, PitchConfig, PitchControl, StartTrigger,
    ThermalAcquire, TriggerConfig, YawConfig, YawControl,
};
use thermal_turret::{Error, SharedChannel, TargetEstimate};

const FRAME_WIDTH: usize = 32;
const FRAME_HEIGHT: usize = 24;

struct Args {
    limit_ms: u32,
    target_row: usize,
    step_ms: u32,
}

fn parse_args() -> Args {
    let mut args = Args {
        limit_ms: 120_000,
        target_row: 6,
        step_ms: 5,
    };

    let raw: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--limit" => {
                i += 1;
                args.limit_ms = parse_u32_arg(&raw, i, "limit").saturating_mul(1_000);
            }
            "--row" => {
                i += 1;
                args.target_row = parse_u32_arg(&raw, i, "row") as usize;
            }
            "--speed" => {
                i += 1;
                args.step_ms = parse_u32_arg(&raw, i, "speed").max(1);
            }
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if args.target_row >= FRAME_HEIGHT {
        eprintln!("--row must be below {FRAME_HEIGHT}");
        process::exit(1);
    }

    args
}

fn parse_u32_arg(raw: &[String], i: usize, name: &str) -> u32 {
    raw.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("--{name} requires an unsigned integer");
        process::exit(1);
    })
}

fn print_usage() {
    eprintln!("Usage: turret-sim [--limit <SECONDS>] [--row <ROW>] [--speed <N>]");
}

/// Plant gain that lets the proportional loop close the whole error in one
/// control period, given the plant is advanced every `step_ms`.
fn deadbeat_gain(kp: f64, task: TaskConfig, step_ms: u32) -> f64 {
    let steps_per_period = task.period.0.div_ceil(step_ms).max(1);
    1. / (kp * f64::from(steps_per_period))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    if let Err(error) = run(args).await {
        log::error!("turret-sim stopped: {}", error);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let table = ScheduleTable::default();
    let pitch_config = PitchConfig::default();
    let yaw_config = YawConfig::default();

    let start = SharedChannel::new("start");
    let target = SharedChannel::<TargetEstimate>::new("target");
    let pitch_done = SharedChannel::new("pitch_done");
    let yaw_done = SharedChannel::new("yaw_done");

    let trigger_line = SimLine::default();
    let camera = SimCamera::new(FRAME_WIDTH, FRAME_HEIGHT);
    camera.set_target_row(Some(args.target_row));
    let pitch_axis = SimAxis::new(deadbeat_gain(
        pitch_config.kp,
        table.pitch_control,
        args.step_ms,
    ));
    let yaw_axis = SimAxis::new(deadbeat_gain(
        yaw_config.kp,
        table.yaw_control,
        args.step_ms,
    ));
    let flywheel = SimLine::default();
    let plunger = SimLine::default();

    let mut trigger = StartTrigger::new(trigger_line.clone(), &start, TriggerConfig::default());
    let mut acquire = ThermalAcquire::new(camera, &start, &target, AcquireConfig::default());
    let mut pitch = PitchControl::new(
        pitch_axis.encoder().with_id("pitch encoder"),
        pitch_axis.bridge()?.with_name("pitch motor"),
        &start,
        &pitch_done,
        pitch_config,
    );
    let mut yaw = YawControl::new(
        yaw_axis.encoder().with_id("yaw encoder"),
        yaw_axis.bridge()?.with_name("yaw motor"),
        &start,
        &target,
        &yaw_done,
        yaw_config,
    );
    let mut fire = FireSequence::new(
        flywheel.clone(),
        plunger,
        &start,
        &pitch_done,
        &yaw_done,
        FireConfig::default(),
    );

    let clock = SimClock::default();
    let mut scheduler = Scheduler::new(clock.clone())
        .with_task(Task::new(&mut trigger).with_config(table.start_trigger))
        .with_task(Task::new(&mut acquire).with_config(table.thermal_acquire))
        .with_task(Task::new(&mut pitch).with_config(table.pitch_control))
        .with_task(Task::new(&mut yaw).with_config(table.yaw_control))
        .with_task(Task::new(&mut fire).with_config(table.fire_sequence));

    log::info!(
        "turret-sim: target on row {}, {} ms per step, limit {} s",
        args.target_row,
        args.step_ms,
        args.limit_ms / 1_000
    );
    trigger_line.set(true);

    let mut interval = tokio::time::interval(Duration::from_millis(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut spun_up = false;
    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("turret-sim: shutdown requested");
                break Ok(());
            }
            _ = interval.tick() => {}
        }

        if let Err(error) = scheduler.run() {
            break Err(error);
        }
        pitch_axis.advance();
        yaw_axis.advance();

        spun_up |= flywheel.is_set();
        if spun_up && !flywheel.is_set() {
            log::info!("turret-sim: launcher spent at {} ms", clock.millis());
            break Ok(());
        }
        if clock.millis() >= args.limit_ms {
            log::warn!("turret-sim: time limit reached");
            break Ok(());
        }
        clock.advance(args.step_ms);
    };

    let shutdown = scheduler.shutdown();
    for task in scheduler.tasks() {
        log::info!(
            "{}: {} runs, {} slips",
            task.name(),
            task.stats.runs,
            task.stats.slips
        );
    }
    log::info!("{} scheduler passes", scheduler.passes());
    drop(scheduler);

    log::info!(
        "pitch at {} counts, yaw at {} counts, {} shots fired",
        pitch.position(),
        yaw.position(),
        fire.shots_fired()
    );
    log::info!(
        "motors braked: pitch {}, yaw {}",
        pitch_axis.forward_duty() == 1. && pitch_axis.reverse_duty() == 1.,
        yaw_axis.forward_duty() == 1. && yaw_axis.reverse_duty() == 1.
    );
    result.and(shutdown)
}
