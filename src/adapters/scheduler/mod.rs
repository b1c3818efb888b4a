//! Background schedulers.
//!
//! Long-running tasks that drive time-based behavior: today only the
//! reconciliation sweep. Each scheduler owns its interval loop and stops
//! cleanly on the shared shutdown signal.

mod sweep_scheduler;

pub use sweep_scheduler::{SweepScheduler, SweepSchedulerConfig};
