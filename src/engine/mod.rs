// ABOUTME: Container engine abstraction and connection management.
// ABOUTME: Bollard-backed client, socket detection and liveness-checked reconnection.

mod bollard;
mod connection;
mod detection;
mod error;
mod throttle;
mod traits;
mod types;

pub use self::bollard::{BollardConnector, BollardEngine};
pub use connection::EngineConnection;
pub use detection::{DetectedSocket, EngineKind, detect_local};
pub use error::{ConnectionFailure, EngineError};
pub use throttle::{DEFAULT_LOG_WINDOW, LogThrottle};
pub use traits::{Engine, EngineConnector, PullStream};
pub use types::{
    ContainerStats, ContainerSummary, EngineVersion, ImageInfo, PortBinding, PullEvent, RunSpec,
    VolumeBind,
};
