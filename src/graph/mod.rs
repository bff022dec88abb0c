// src/graph/mod.rs

//! Task graph construction.
//!
//! - [`task`] holds the shared per-task control block.
//! - [`ledger`] tracks, per resource, the last writer and the readers since,
//!   and derives the predecessors of each new task.
//! - [`builder`] normalises resource declarations and attaches new tasks to
//!   their predecessors.

pub mod builder;
pub mod ledger;
pub mod task;

pub use builder::{ResourceSets, wire_dependencies};
pub use ledger::{LedgerEntry, LedgerNode, ResourceLedger};
pub use task::{Action, TaskControl, TaskId};
