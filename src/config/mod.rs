// src/config/mod.rs

//! Workload configuration for the `ooqueue` harness.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a workload file from disk (`loader.rs`).
//! - Validate basic invariants like unique task names (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{QueueSection, RawWorkloadFile, TaskSpec, WorkloadFile};
pub use validate::validate_workload;
