// ABOUTME: Error type for container engine operations.
// ABOUTME: Maps bollard status codes onto the cases callers handle differently.

/// Errors from talking to the container engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("could not communicate with the container engine: {0}")]
    Connection(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not modified: {0}")]
    NotModified(String),

    #[error("pull failed: {0}")]
    Pull(String),

    #[error("engine error: {0}")]
    Runtime(String),
}

/// Failure classes used to rate-limit connection logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionFailure {
    /// The client could not be constructed.
    Create,
    /// The client exists but the engine did not answer.
    Query,
}

impl ConnectionFailure {
    pub fn describe(&self) -> &'static str {
        match self {
            ConnectionFailure::Create => "could not create engine client",
            ConnectionFailure::Query => "failed to query engine",
        }
    }
}

impl EngineError {
    pub fn is_connection(&self) -> bool {
        matches!(self, EngineError::Connection(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

fn status_code(e: &bollard::errors::Error) -> Option<(u16, &str)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

pub(crate) fn map_error(e: bollard::errors::Error) -> EngineError {
    match status_code(&e) {
        Some((404, message)) => EngineError::NotFound(message.to_string()),
        Some((409, message)) => EngineError::Conflict(message.to_string()),
        Some((304, message)) => EngineError::NotModified(message.to_string()),
        _ => EngineError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_pull_error(e: bollard::errors::Error, image_name: &str) -> EngineError {
    match status_code(&e) {
        Some((404, message)) => EngineError::NotFound(format!("{}: {}", image_name, message)),
        _ => EngineError::Pull(format!("{}: {}", image_name, e)),
    }
}
