//! Background Tasks Module
//!
//! Contains the work the engine runs outside of caller requests.
//!
//! # Tasks
//! - Expiration scan: removes expired entries at a fixed interval
//! - Idle prune: removes entries unused for longer than a threshold
//! - Refresh worker: runs detached refresh-ahead jobs

mod cleanup;
mod refresh;

pub use cleanup::{spawn_expiration_task, spawn_idle_prune_task};
pub use refresh::{RefreshJob, RefreshWorker};
