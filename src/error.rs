// ABOUTME: Error type returned by the launcher's commands.
// ABOUTME: Wraps manager errors and adds configuration and launch outcomes.

use crate::manager::ManagerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} already exists (use --force to overwrite)")]
    ConfigExists(PathBuf),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("container engine is not reachable")]
    EngineUnavailable,

    #[error("no local image for {repository}; run `labs-launcher pull` first")]
    NoLocalImage { repository: String },

    #[error("the engine is not allowed to share {mount}; add it to the engine's file sharing settings")]
    FileShareDenied { mount: String },

    #[error("failed to start container: {0}")]
    StartFailed(String),

    #[error("pull cancelled")]
    Cancelled,

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("cannot read or write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
