// ABOUTME: The container engine operations the launcher consumes.
// ABOUTME: Engine is implemented by bollard in production and by fakes in tests.

use super::error::EngineError;
use super::types::{ContainerStats, ContainerSummary, EngineVersion, ImageInfo, PullEvent, RunSpec};
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Stream of progress events from an image pull.
pub type PullStream = Pin<Box<dyn Stream<Item = Result<PullEvent, EngineError>> + Send>>;

/// Operations on a connected container engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Lightweight liveness query.
    async fn version(&self) -> Result<EngineVersion, EngineError>;

    /// The container with exactly this name, running or not.
    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, EngineError>;

    /// The local image for `image`, or `None` if it has not been pulled.
    async fn inspect_image(&self, image: &ImageRef) -> Result<Option<ImageInfo>, EngineError>;

    /// Create and start a detached container.
    async fn run_container(&self, spec: &RunSpec) -> Result<ContainerId, EngineError>;

    async fn kill_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    async fn remove_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    /// A single, non-streaming resource usage snapshot.
    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats, EngineError>;

    /// Start pulling `image`, streaming per-layer progress.
    fn pull_image(&self, image: &ImageRef) -> PullStream;
}

/// Builds engine clients. Construction may fail without touching the engine.
pub trait EngineConnector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn Engine>, EngineError>;
}
