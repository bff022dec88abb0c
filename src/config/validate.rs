// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{RawWorkloadFile, WorkloadFile};
use crate::errors::{QueueError, Result};

/// Longest simulated task the harness accepts.
pub const MAX_SLEEP_MS: u64 = 60_000;

impl TryFrom<RawWorkloadFile> for WorkloadFile {
    type Error = QueueError;

    fn try_from(raw: RawWorkloadFile) -> std::result::Result<Self, Self::Error> {
        validate_workload(&raw)?;
        Ok(WorkloadFile::new_unchecked(raw.queue, raw.task))
    }
}

/// Check a raw workload without consuming it.
pub fn validate_workload(raw: &RawWorkloadFile) -> Result<()> {
    ensure_has_tasks(raw)?;
    validate_queue_section(raw)?;
    validate_tasks(raw)?;
    Ok(())
}

fn ensure_has_tasks(raw: &RawWorkloadFile) -> Result<()> {
    if raw.task.is_empty() {
        return Err(QueueError::ConfigError(
            "workload must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_queue_section(raw: &RawWorkloadFile) -> Result<()> {
    if raw.queue.workers == 0 {
        return Err(QueueError::ConfigError(
            "[queue].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if raw.queue.iterations == 0 {
        return Err(QueueError::ConfigError(
            "[queue].iterations must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(raw: &RawWorkloadFile) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, task) in raw.task.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(QueueError::ConfigError(format!(
                "task #{index} has an empty name"
            )));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(QueueError::ConfigError(format!(
                "duplicate task name '{}'",
                task.name
            )));
        }
        if task.repeat == 0 {
            return Err(QueueError::ConfigError(format!(
                "task '{}' has repeat = 0 (must be >= 1)",
                task.name
            )));
        }
        if task.sleep_ms > MAX_SLEEP_MS {
            return Err(QueueError::ConfigError(format!(
                "task '{}' sleeps {}ms, above the {}ms limit",
                task.name, task.sleep_ms, MAX_SLEEP_MS
            )));
        }
        if let Some(empty) = task
            .writes
            .iter()
            .chain(task.reads.iter())
            .find(|r| r.trim().is_empty())
        {
            return Err(QueueError::ConfigError(format!(
                "task '{}' declares an empty resource name {:?}",
                task.name, empty
            )));
        }
    }
    Ok(())
}
