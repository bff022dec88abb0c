// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawWorkloadFile, WorkloadFile};
use crate::errors::Result;

/// Load a workload file and return the raw, unvalidated model.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkloadFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let workload: RawWorkloadFile = toml::from_str(&contents)?;

    Ok(workload)
}

/// Load a workload file and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkloadFile> {
    let raw = load_from_path(&path)?;
    let workload = WorkloadFile::try_from(raw)?;
    Ok(workload)
}
