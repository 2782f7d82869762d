// ABOUTME: Orchestrator error types with SNAFU pattern.
// ABOUTME: Only returned by operations whose callers need the reason; start and stop record failures instead.

use snafu::Snafu;

use crate::engine::EngineError;
use crate::puller::PullError;
use crate::registry::RegistryError;

/// Errors surfaced by the container manager's query and pull operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ManagerError {
    #[snafu(display("container engine is not reachable: {source}"))]
    EngineUnavailable { source: EngineError },

    #[snafu(display("container engine operation failed: {source}"))]
    Engine { source: EngineError },

    #[snafu(display("registry lookup failed: {source}"))]
    Registry { source: RegistryError },

    #[snafu(display("image pull failed: {source}"))]
    Pull { source: PullError },

    #[snafu(display("no local tag available for {repository}"))]
    NoLocalTag { repository: String },

    #[snafu(display("registry has no tags for {repository}"))]
    NoRemoteTag { repository: String },

    #[snafu(display("a pull is already in progress"))]
    PullInProgress,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerErrorKind {
    /// The engine did not answer.
    EngineUnavailable,
    /// The engine answered but the operation failed.
    Engine,
    /// The registry could not be queried or lacked the tag.
    Registry,
    /// The pull stream failed.
    Pull,
    /// No tag of the image is present locally.
    NoLocalTag,
    /// The registry lists no usable tags.
    NoRemoteTag,
    /// Another pull holds the pull slot.
    PullInProgress,
}

impl ManagerError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ManagerErrorKind {
        match self {
            ManagerError::EngineUnavailable { .. } => ManagerErrorKind::EngineUnavailable,
            ManagerError::Engine { .. } => ManagerErrorKind::Engine,
            ManagerError::Registry { .. } => ManagerErrorKind::Registry,
            ManagerError::Pull { source } => match source {
                PullError::Registry(_) => ManagerErrorKind::Registry,
                PullError::Engine(e) if e.is_connection() => ManagerErrorKind::EngineUnavailable,
                _ => ManagerErrorKind::Pull,
            },
            ManagerError::NoLocalTag { .. } => ManagerErrorKind::NoLocalTag,
            ManagerError::NoRemoteTag { .. } => ManagerErrorKind::NoRemoteTag,
            ManagerError::PullInProgress => ManagerErrorKind::PullInProgress,
        }
    }
}

impl From<EngineError> for ManagerError {
    fn from(source: EngineError) -> Self {
        if source.is_connection() {
            ManagerError::EngineUnavailable { source }
        } else {
            ManagerError::Engine { source }
        }
    }
}

impl From<RegistryError> for ManagerError {
    fn from(source: RegistryError) -> Self {
        ManagerError::Registry { source }
    }
}

impl From<PullError> for ManagerError {
    fn from(source: PullError) -> Self {
        ManagerError::Pull { source }
    }
}
