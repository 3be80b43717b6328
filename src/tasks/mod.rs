//! The five turret tasks.
//!
//! Each task is an explicit state machine advanced by one
//! [`Step::step`](crate::scheduler::Step::step) per scheduler tick. Tasks
//! only talk to each other through [`SharedChannel`](crate::SharedChannel)s:
//!
//! ```text
//! start trigger --start--> thermal acquire --target--> yaw control --yaw_done--+
//!                   |                                                          |
//!                   +----> pitch control --pitch_done-----------> fire sequence <+
//! ```

mod axis;
pub use axis::{settled, Axis};

pub mod fire;
pub use fire::{FireConfig, FirePhase, FireSequence, FireState};

pub mod pitch;
pub use pitch::{PitchConfig, PitchControl, PitchState};

pub mod start_trigger;
pub use start_trigger::{StartState, StartTrigger, TriggerConfig};

pub mod thermal_acquire;
pub use thermal_acquire::{AcquireConfig, AcquireState, ThermalAcquire};

pub mod yaw;
pub use yaw::{YawConfig, YawControl, YawState};
