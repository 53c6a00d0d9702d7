// [apps/monitor/src/scheduler/mod.rs]
//! Instance Scheduler & Runtime Manager: `worker` is one
//! instance's cancellable loop, `runtime_manager` is the concurrent map
//! that owns Workers by instance id.

pub mod runtime_manager;
pub mod worker;

pub use runtime_manager::RuntimeManager;
pub use worker::{WorkerSnapshot, WorkerStatus};
