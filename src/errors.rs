// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TaskId;

#[derive(Error, Debug)]
pub enum SimonError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Simulation root directory {0:?} does not exist or is not readable")]
    RootDir(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Simulation instance #{0} does not exist")]
    TaskNotFound(TaskId),

    #[error("Simulation instance #{0} has no simulation code attached")]
    NoProvider(TaskId),

    #[error("Unknown simulation code '{code}' in {dir:?}")]
    UnknownCode { code: String, dir: PathBuf },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("{action} failed for {dir:?}: {source}")]
    Action {
        action: &'static str,
        dir: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SimonError>;
