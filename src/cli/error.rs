//! CLI error types

use crate::import::ImportError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),
    #[error("Invalid config file {0}: {1}")]
    ConfigError(PathBuf, String),
    #[error("{0} is not a diagram snapshot: {1}")]
    InvalidDiagram(String, String),
    #[error("Import failed: {0}")]
    ImportError(#[from] ImportError),
    #[error("Failed to serialize output: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::ImportError(_) | CliError::InvalidDiagram(..) => 3,
            _ => 1,
        }
    }
}
