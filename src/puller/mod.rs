// ABOUTME: Image pulls with byte-level progress and cooperative cancellation.
// ABOUTME: Progress is measured against the registry's published image size.

mod platform;

pub use platform::{DOCKER_DESKTOP_BIN, helper_search_path, prepare_host_environment};

use crate::engine::{Engine, EngineError, ImageInfo};
use crate::registry::{RegistryError, RegistryTagSource};
use crate::types::{ImageRef, ImageRefError};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that end a pull early. Cancellation is not one of them.
#[derive(Debug, Error)]
pub enum PullError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    NoTag(#[from] ImageRefError),

    #[error("pull of {0} finished but the image is not present locally")]
    Missing(String),
}

/// Shared flag a caller sets to stop a pull between streamed events.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bytes downloaded per layer against an expected total.
#[derive(Debug, Clone, Default)]
pub struct PullProgress {
    layers: HashMap<String, u64>,
    total: Option<u64>,
}

impl PullProgress {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            layers: HashMap::new(),
            total,
        }
    }

    /// Record a layer's running byte count. Per-layer counts never go backwards.
    pub fn record(&mut self, layer: &str, bytes: u64) {
        let entry = self.layers.entry(layer.to_string()).or_insert(0);
        *entry = (*entry).max(bytes);
    }

    pub fn downloaded(&self) -> u64 {
        self.layers.values().sum()
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Percentage of the total downloaded so far, capped at 100.
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => {
                Some((self.downloaded() as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

/// A completed pull.
#[derive(Debug, Clone)]
pub struct PulledImage {
    pub info: ImageInfo,
    pub total_bytes: Option<u64>,
}

/// Pulls tagged images from the engine, reporting progress as a percentage.
pub struct ImagePuller {
    registry: Arc<RegistryTagSource>,
}

impl ImagePuller {
    pub fn new(registry: Arc<RegistryTagSource>) -> Self {
        Self { registry }
    }

    /// The published compressed size of `image`, if the registry reports one.
    pub async fn total_size(&self, image: &ImageRef) -> Result<Option<u64>, PullError> {
        let tag = image
            .tag()
            .ok_or_else(|| ImageRefError::NoTag(image.repository().to_string()))?;
        let meta = self.registry.get_tag_meta(image.repository(), tag).await?;
        Ok(meta.full_size)
    }

    /// Pull `image`, calling `on_progress` after each download event.
    ///
    /// `total` is the expected size from [`ImagePuller::total_size`]; without
    /// it only the final `100.0` is reported. Returns `Ok(None)` when `cancel`
    /// was signalled. Partially downloaded
    /// layers stay on the engine and are reused by the next pull. A completed
    /// pull reports exactly one final `100.0`; intermediate reports stay below it.
    pub async fn pull(
        &self,
        engine: &dyn Engine,
        image: &ImageRef,
        total: Option<u64>,
        on_progress: &mut (dyn FnMut(f64) + Send),
        cancel: &CancelToken,
    ) -> Result<Option<PulledImage>, PullError> {
        let name = image.full_name()?;
        let mut progress = PullProgress::new(total);

        info!(image = %name, total_bytes = ?total, "pulling image");
        let mut events = engine.pull_image(image);

        while let Some(event) = events.next().await {
            if cancel.is_cancelled() {
                info!(image = %name, downloaded = progress.downloaded(), "pull cancelled");
                return Ok(None);
            }

            let event = event?;
            let Some((layer, bytes)) = event.downloading() else {
                debug!(image = %name, status = ?event.status, layer = ?event.id, "pull event");
                continue;
            };
            progress.record(layer, bytes);

            if let Some(percent) = progress.percent()
                && percent < 100.0
            {
                on_progress(percent);
            }
        }

        if cancel.is_cancelled() {
            info!(image = %name, "pull cancelled");
            return Ok(None);
        }

        on_progress(100.0);

        let info = engine
            .inspect_image(image)
            .await?
            .ok_or_else(|| PullError::Missing(name.clone()))?;
        info!(image = %name, id = %info.id.short(), "pull complete");

        Ok(Some(PulledImage {
            info,
            total_bytes: total,
        }))
    }
}
