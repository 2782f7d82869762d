// ABOUTME: The container lifecycle and availability manager.
// ABOUTME: Tracks engine reachability, container status and tags; runs start, stop and pull.

mod error;
mod failure;
mod heartbeat;
mod launch;
mod observer;
mod state;

pub use error::{ManagerError, ManagerErrorKind};
pub use failure::classify;
pub use heartbeat::{DEFAULT_HEARTBEAT, Heartbeat};
pub use launch::{LaunchRequest, build_run_spec};
pub use observer::Observers;
pub use state::{CurrentTag, FailureKind, LastFailure, ManagerSnapshot};

use crate::config::Config;
use crate::engine::{
    BollardConnector, Engine, EngineConnection, EngineError, EngineVersion, ImageInfo,
};
use crate::puller::{CancelToken, ImagePuller, PulledImage};
use crate::registry::{HttpTagFetcher, RegistryOptions, RegistryTagSource};
use crate::types::{ContainerId, ContainerStatus, ImageRef};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_SERVER_NAME: &str = "Epi2Me-Labs-Server";
pub const DEFAULT_DATA_BIND: &str = "/epi2melabs/";
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// Base command of the notebook server, before the token and port are appended.
pub const DEFAULT_CONTAINER_CMD: &[&str] = &[
    "start-notebook.sh",
    "--NotebookApp.allow_origin=https://colab.research.google.com",
    "--NotebookApp.disable_check_xsrf=True",
    "--NotebookApp.port_retries=0",
    "--no-browser",
    "--notebook-dir=/",
];

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed inputs of a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Image repository, e.g. `ontresearch/nanolabs-notebook`.
    pub repository: String,
    /// Name of the managed container.
    pub server_name: String,
    /// Path inside the container where the data directory is mounted.
    pub data_bind: String,
    pub container_cmd: Vec<String>,
    /// Publish ports on loopback only.
    pub host_only: bool,
    /// Use this tag instead of asking the registry.
    pub fixed_tag: Option<String>,
    pub tag_prefix: String,
}

impl ManagerSettings {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            data_bind: DEFAULT_DATA_BIND.to_string(),
            container_cmd: DEFAULT_CONTAINER_CMD.iter().map(|s| s.to_string()).collect(),
            host_only: true,
            fixed_tag: None,
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }

    fn image(&self, tag: &str) -> ImageRef {
        ImageRef::new(&self.repository).with_tag(tag)
    }
}

/// Releases the pull slot when a pull ends, however it ends.
struct PullSlot<'a>(&'a AtomicBool);

impl Drop for PullSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the observable state of the managed container.
///
/// All state changes go through one operation lock, so a heartbeat refresh
/// never interleaves with a start or stop. Published values are read from
/// [`Observers`] without taking that lock.
pub struct ContainerManager {
    settings: ManagerSettings,
    connection: EngineConnection,
    registry: Arc<RegistryTagSource>,
    puller: ImagePuller,
    op_lock: tokio::sync::Mutex<()>,
    observers: Observers,
    pull_active: AtomicBool,
}

impl ContainerManager {
    pub fn new(
        settings: ManagerSettings,
        connection: EngineConnection,
        registry: Arc<RegistryTagSource>,
    ) -> Self {
        Self {
            settings,
            connection,
            puller: ImagePuller::new(Arc::clone(&registry)),
            registry,
            op_lock: tokio::sync::Mutex::new(()),
            observers: Observers::new(),
            pull_active: AtomicBool::new(false),
        }
    }

    /// Build a manager talking to the local engine and the configured registry.
    pub fn from_config(config: &Config) -> Result<Self, ManagerError> {
        let connector = BollardConnector::new(config.engine.socket.clone());
        let connection = EngineConnection::new(Arc::new(connector));

        let fetcher = HttpTagFetcher::new(REGISTRY_TIMEOUT)?;
        let options = RegistryOptions {
            base_url: config.registry_url(),
            catalog_ttl: config.cache.ttl,
            meta_entries: config.cache.meta_entries,
        };
        let registry = RegistryTagSource::new(Arc::new(fetcher), options);

        Ok(Self::new(
            config.manager_settings(),
            connection,
            Arc::new(registry),
        ))
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    /// A copy of every published value.
    pub fn snapshot(&self) -> ManagerSnapshot {
        self.observers.snapshot()
    }

    /// Version details of the engine, if it answers.
    pub async fn engine_version(&self) -> Result<EngineVersion, ManagerError> {
        let engine = self.connection.client().await?;
        Ok(engine.version().await?)
    }

    /// Re-check reachability and re-derive status. Returns whether any
    /// published value changed.
    ///
    /// The tag is resolved again only when the engine becomes reachable.
    pub async fn refresh(&self) -> bool {
        let _guard = self.op_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let mut changed = false;

        let Ok(engine) = self.connection.client().await else {
            changed |= self.observers.set_tag(CurrentTag::Unknown);
            changed |= self.observers.set_status(ContainerStatus::Unknown);
            changed |= self.observers.set_available(false);
            return changed;
        };

        if !self.observers.available() {
            let tag = self.resolve_current_tag(engine.as_ref()).await;
            changed |= self.observers.set_tag(tag);
        }

        let status = self.derive_status(engine.as_ref()).await;
        changed |= self.observers.set_status(status);
        changed |= self.observers.set_available(true);

        if changed {
            debug!(
                status = %self.observers.status().current,
                tag = %self.observers.tag(),
                "state refreshed"
            );
        }
        changed
    }

    async fn resolve_current_tag(&self, engine: &dyn Engine) -> CurrentTag {
        match self.local_tag_with(engine).await {
            Ok(tag) => CurrentTag::from(tag),
            Err(e) => {
                warn!(error = %e, "could not resolve local tag");
                CurrentTag::Unknown
            }
        }
    }

    async fn derive_status(&self, engine: &dyn Engine) -> ContainerStatus {
        match engine.find_container(&self.settings.server_name).await {
            Ok(Some(container)) => container.status,
            Ok(None) => ContainerStatus::Inactive,
            Err(e) => {
                warn!(error = %e, container = %self.settings.server_name, "could not query container");
                ContainerStatus::Unknown
            }
        }
    }

    /// Every usable registry tag of the image, newest first.
    pub async fn remote_tags(&self) -> Result<Vec<String>, ManagerError> {
        Ok(self
            .registry
            .list_tags(&self.settings.repository, &self.settings.tag_prefix)
            .await?)
    }

    /// Newest tag in the registry, or the fixed tag when one is configured.
    ///
    /// `None` means the registry lists no usable tags.
    pub async fn latest_remote_tag(&self) -> Result<Option<String>, ManagerError> {
        if let Some(ref tag) = self.settings.fixed_tag {
            return Ok(Some(tag.clone()));
        }
        let tags = self
            .registry
            .list_tags(&self.settings.repository, &self.settings.tag_prefix)
            .await?;
        Ok(tags.into_iter().next())
    }

    /// Newest registry tag that is present locally.
    pub async fn latest_local_tag(&self) -> Result<Option<String>, ManagerError> {
        let engine = self.connection.client().await?;
        self.local_tag_with(engine.as_ref()).await
    }

    async fn local_tag_with(&self, engine: &dyn Engine) -> Result<Option<String>, ManagerError> {
        if let Some(ref tag) = self.settings.fixed_tag {
            return Ok(Some(tag.clone()));
        }

        let tags = self
            .registry
            .list_tags(&self.settings.repository, &self.settings.tag_prefix)
            .await?;
        for tag in tags {
            if engine.inspect_image(&self.settings.image(&tag)).await?.is_some() {
                return Ok(Some(tag));
            }
        }
        Ok(None)
    }

    /// Whether the registry has a newer tag than the newest local one.
    ///
    /// `false` while the engine is unreachable or the registry lists nothing.
    pub async fn update_available(&self) -> Result<bool, ManagerError> {
        let Ok(engine) = self.connection.client().await else {
            return Ok(false);
        };
        let local = self.local_tag_with(engine.as_ref()).await?;
        let remote = self.latest_remote_tag().await?;
        Ok(match remote {
            Some(remote) => local.as_deref() != Some(remote.as_str()),
            None => false,
        })
    }

    /// `repository:tag`, defaulting to the newest local tag.
    pub async fn full_image_name(&self, tag: Option<&str>) -> Result<String, ManagerError> {
        let tag = match tag {
            Some(tag) => tag.to_string(),
            None => self
                .latest_local_tag()
                .await?
                .ok_or_else(|| ManagerError::NoLocalTag {
                    repository: self.settings.repository.clone(),
                })?,
        };
        Ok(self.settings.image(&tag).to_string())
    }

    /// The local image for `tag` (default: newest local tag).
    ///
    /// With `update` the newest remote tag is used instead and pulled if it is
    /// missing locally. `None` when nothing could be resolved or the pull was
    /// cancelled.
    pub async fn resolve_image(
        &self,
        tag: Option<String>,
        update: bool,
    ) -> Result<Option<ImageInfo>, ManagerError> {
        let engine = self.connection.client().await?;

        let tag = if update {
            Some(
                self.latest_remote_tag()
                    .await?
                    .ok_or_else(|| ManagerError::NoRemoteTag {
                        repository: self.settings.repository.clone(),
                    })?,
            )
        } else {
            match tag {
                Some(tag) => Some(tag),
                None => self.local_tag_with(engine.as_ref()).await?,
            }
        };
        let Some(tag) = tag else {
            return Ok(None);
        };

        if let Some(info) = engine.inspect_image(&self.settings.image(&tag)).await? {
            return Ok(Some(info));
        }
        if !update {
            return Ok(None);
        }

        let pulled = self.pull(Some(tag), |_| {}, &CancelToken::new()).await?;
        Ok(pulled.map(|p| p.info))
    }

    /// Replace any existing container with a fresh one.
    ///
    /// Failures are recorded in `last_failure` rather than returned. A recorded
    /// failure stays until the next one or [`ContainerManager::clear_last_failure`].
    /// Status is refreshed afterwards either way.
    pub async fn start(&self, request: &LaunchRequest) {
        let _guard = self.op_lock.lock().await;
        info!(container = %self.settings.server_name, "starting container");

        match self.connection.client().await {
            Ok(engine) => {
                if let Err(e) = self.clear_with(engine.as_ref()).await {
                    warn!(error = %e, "could not clear previous container");
                }
                match self.launch(engine.as_ref(), request).await {
                    Ok(id) => info!(id = %id.short(), "container started"),
                    Err(detail) => self.record_failure(detail),
                }
            }
            Err(e) => self.record_failure(e.to_string()),
        }

        self.observers.set_final_stats(None);
        self.refresh_locked().await;
    }

    async fn launch(
        &self,
        engine: &dyn Engine,
        request: &LaunchRequest,
    ) -> Result<ContainerId, String> {
        let tag = self
            .local_tag_with(engine)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("no local tag available for {}", self.settings.repository))?;
        let image = self.settings.image(&tag).to_string();

        let spec = build_run_spec(&self.settings, &image, request);
        debug!(image = %image, command = ?spec.command, "running container");
        engine.run_container(&spec).await.map_err(|e| e.to_string())
    }

    fn record_failure(&self, detail: String) {
        let kind = classify(&detail);
        warn!(error = %detail, "failed to start container");
        if kind == FailureKind::FileShareDenied {
            warn!("the engine was not allowed to share the data directory");
        }
        self.observers
            .set_last_failure(LastFailure::new(kind, detail));
    }

    /// Stop and remove the container. A missing container is not an error.
    pub async fn stop(&self) {
        let _guard = self.op_lock.lock().await;

        match self.connection.client().await {
            Ok(engine) => {
                if let Err(e) = self.clear_with(engine.as_ref()).await {
                    warn!(error = %e, "could not stop container");
                }
            }
            Err(e) => debug!(error = %e, "engine unreachable, nothing to stop"),
        }

        self.refresh_locked().await;
    }

    /// Kill (if running) and remove the named container, capturing final
    /// stats before the kill.
    async fn clear_with(&self, engine: &dyn Engine) -> Result<(), EngineError> {
        let Some(container) = engine.find_container(&self.settings.server_name).await? else {
            return Ok(());
        };

        if container.status.is_running() {
            info!(id = %container.id.short(), "stopping container");
            match engine.container_stats(&container.id).await {
                Ok(stats) => self.observers.set_final_stats(Some(stats)),
                Err(e) => warn!(error = %e, "could not capture final stats"),
            }
            match engine.kill_container(&container.id).await {
                Ok(()) => info!("container stopped"),
                // Exited between listing and kill
                Err(EngineError::Conflict(_)) => debug!("container was no longer running"),
                Err(e) => return Err(e),
            }
        }

        info!(id = %container.id.short(), "removing container");
        match engine.remove_container(&container.id).await {
            Ok(()) | Err(EngineError::NotFound(_)) => {
                info!("container removed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Pull `tag` (default: newest remote tag), publishing progress.
    ///
    /// Only one pull runs at a time; a second call fails with
    /// [`ManagerError::PullInProgress`]. On success the current tag is
    /// re-resolved.
    pub async fn pull<F>(
        &self,
        tag: Option<String>,
        mut on_progress: F,
        cancel: &CancelToken,
    ) -> Result<Option<PulledImage>, ManagerError>
    where
        F: FnMut(f64) + Send,
    {
        if self.pull_active.swap(true, Ordering::SeqCst) {
            return Err(ManagerError::PullInProgress);
        }
        let _slot = PullSlot(&self.pull_active);

        let engine = self.connection.client().await?;
        let tag = match tag {
            Some(tag) => tag,
            None => self
                .latest_remote_tag()
                .await?
                .ok_or_else(|| ManagerError::NoRemoteTag {
                    repository: self.settings.repository.clone(),
                })?,
        };
        let image = self.settings.image(&tag);

        let total = self.puller.total_size(&image).await?;
        self.observers.set_total_pull_size(total);
        self.observers.set_progress(Some(0.0));

        let observers = &self.observers;
        let mut report = |percent: f64| {
            observers.set_progress(Some(percent));
            on_progress(percent);
        };

        let result = self
            .puller
            .pull(engine.as_ref(), &image, total, &mut report, cancel)
            .await;

        match result {
            Ok(Some(pulled)) => {
                let _guard = self.op_lock.lock().await;
                let current = self.resolve_current_tag(engine.as_ref()).await;
                self.observers.set_tag(current);
                Ok(Some(pulled))
            }
            Ok(None) => {
                self.observers.set_progress(None);
                Ok(None)
            }
            Err(e) => {
                self.observers.set_progress(None);
                Err(e.into())
            }
        }
    }

    /// Run [`ContainerManager::pull`] as a background task.
    pub fn spawn_pull(
        self: &Arc<Self>,
        tag: Option<String>,
        cancel: CancelToken,
    ) -> JoinHandle<Result<Option<PulledImage>, ManagerError>> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.pull(tag, |_| {}, &cancel).await })
    }

    /// Forget the last launch failure.
    pub async fn clear_last_failure(&self) {
        let _guard = self.op_lock.lock().await;
        self.observers.set_last_failure(LastFailure::default());
    }

    /// Resolve the current tag again, e.g. after images changed outside the manager.
    pub async fn reload_tag(&self) -> Result<CurrentTag, ManagerError> {
        let _guard = self.op_lock.lock().await;
        let engine = self.connection.client().await?;
        let tag = CurrentTag::from(self.local_tag_with(engine.as_ref()).await?);
        self.observers.set_tag(tag.clone());
        Ok(tag)
    }

    /// Refresh every `period` in the background until the handle is stopped.
    pub fn start_heartbeat(self: &Arc<Self>, period: Duration) -> Heartbeat {
        Heartbeat::spawn(Arc::downgrade(self), period)
    }
}
