// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::graph::TaskId;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task {task} panicked: {message}")]
    TaskPanicked { task: TaskId, message: String },

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, QueueError>;
