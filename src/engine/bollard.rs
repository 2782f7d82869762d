// ABOUTME: Bollard-based container engine implementation.
// ABOUTME: Works with Docker and Podman through the Docker-compatible API.

use super::detection::detect_local;
use super::error::{EngineError, map_error, map_pull_error};
use super::traits::{Engine, EngineConnector, PullStream};
use super::types::{
    ContainerStats, ContainerSummary, EngineVersion, ImageInfo, PullEvent, RunSpec, VolumeBind,
};
use crate::types::{ContainerId, ContainerStatus, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, KillContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StatsOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Listings tried before a transient container state is reported as an error.
const LIST_ATTEMPTS: u32 = 3;
const LIST_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Podman reports `stopping` and `stopped` during shutdown, which bollard
/// cannot deserialize.
fn is_transient_state_error(message: &str) -> bool {
    message.contains("unknown variant `stopping`") || message.contains("unknown variant `stopped`")
}

/// Run a container listing, listing again while the failure is a transient state.
async fn retry_transient_states<T, E, F, Fut>(mut list: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match list().await {
            Err(e) if attempt < LIST_ATTEMPTS && is_transient_state_error(&e.to_string()) => {
                debug!(attempt, error = %e, "container in a transient state; listing again");
                tokio::time::sleep(LIST_RETRY_DELAY).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// `source:target:mode` as the engine's `Binds` expects. Unlike mounts,
/// binds create a missing host directory.
fn bind_spec(volume: &VolumeBind) -> String {
    let mode = if volume.read_only { "ro" } else { "rw" };
    format!("{}:{}:{}", volume.source, volume.target, mode)
}

/// Engine implementation using bollard.
#[derive(Clone)]
pub struct BollardEngine {
    client: Docker,
}

impl BollardEngine {
    pub fn new(client: Docker) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Engine for BollardEngine {
    async fn version(&self) -> Result<EngineVersion, EngineError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| EngineError::Connection(e.to_string()))?;

        Ok(EngineVersion {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
        })
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, EngineError> {
        // The engine's name filter matches substrings, so compare exactly afterwards
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("name".to_string(), vec![name.to_string()]);

        let opts = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..Default::default()
        };

        let client = &self.client;
        let containers = retry_transient_states(|| client.list_containers(Some(opts.clone())))
            .await
            .map_err(map_error)?;

        Ok(containers.into_iter().find_map(|c| {
            let names = c.names.unwrap_or_default();
            let matched = names.iter().any(|n| n.trim_start_matches('/') == name);
            if !matched {
                return None;
            }
            let state = c
                .state
                .map(|s| format!("{:?}", s).to_lowercase())
                .unwrap_or_default();
            Some(ContainerSummary {
                id: ContainerId::new(c.id.unwrap_or_default()),
                name: name.to_string(),
                image: c.image.unwrap_or_default(),
                status: ContainerStatus::from_engine_state(&state),
            })
        }))
    }

    async fn inspect_image(&self, image: &ImageRef) -> Result<Option<ImageInfo>, EngineError> {
        let image_name = image.to_string();

        match self.client.inspect_image(&image_name).await {
            Ok(details) => Ok(Some(ImageInfo {
                id: ImageId::new(details.id.unwrap_or_default()),
                reference: image.clone(),
                size: details.size.and_then(|s| u64::try_from(s).ok()),
            })),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(EngineError::Runtime(format!(
                "failed to inspect {}: {}",
                image_name, e
            ))),
        }
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<ContainerId, EngineError> {
        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        let mut exposed_ports: Vec<String> = Vec::new();
        for binding in &spec.ports {
            let port_key = format!("{}/tcp", binding.port);
            exposed_ports.push(port_key.clone());
            port_bindings.insert(
                port_key,
                Some(vec![PortBinding {
                    host_ip: binding.host_ip.clone(),
                    host_port: Some(binding.port.to_string()),
                }]),
            );
        }

        let binds: Vec<String> = spec.volumes.iter().map(bind_spec).collect();

        let host_config = HostConfig {
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            binds: if binds.is_empty() { None } else { Some(binds) },
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            env: if env.is_empty() { None } else { Some(env) },
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(spec.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_error)?;
        let id = ContainerId::new(response.id);

        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_error)?;

        Ok(id)
    }

    async fn kill_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        self.client
            .kill_container(id.as_str(), None::<KillContainerOptions>)
            .await
            .map_err(map_error)
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        let opts = RemoveContainerOptions {
            force: false,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_error)
    }

    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats, EngineError> {
        let opts = StatsOptions {
            stream: false,
            ..Default::default()
        };

        let mut stream = self.client.stats(id.as_str(), Some(opts));
        let stats = match stream.next().await {
            Some(result) => result.map_err(map_error)?,
            None => {
                return Err(EngineError::Runtime(format!(
                    "engine returned no stats for {}",
                    id.short()
                )));
            }
        };

        let raw = serde_json::to_value(&stats)
            .map_err(|e| EngineError::Runtime(format!("failed to encode stats: {}", e)))?;
        Ok(ContainerStats::from_json(raw))
    }

    fn pull_image(&self, image: &ImageRef) -> PullStream {
        let image_name = image.to_string();
        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        let stream = self.client.create_image(Some(opts), None, None).map(move |result| {
            result
                .map(|info| {
                    let detail = info.progress_detail.as_ref();
                    PullEvent {
                        id: info.id.clone(),
                        status: info.status.clone(),
                        current: detail
                            .and_then(|d| d.current)
                            .and_then(|c| u64::try_from(c).ok()),
                        total: detail
                            .and_then(|d| d.total)
                            .and_then(|t| u64::try_from(t).ok()),
                    }
                })
                .map_err(|e| map_pull_error(e, &image_name))
        });

        Box::pin(stream)
    }
}

/// Builds bollard clients for an explicit socket or a detected local engine.
#[derive(Debug, Clone, Default)]
pub struct BollardConnector {
    socket: Option<String>,
}

impl BollardConnector {
    pub fn new(socket: Option<String>) -> Self {
        Self { socket }
    }
}

impl EngineConnector for BollardConnector {
    fn connect(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let client = match self.socket {
            Some(ref socket) => connect_socket(socket)?,
            None => match detect_local() {
                Some(found) => {
                    debug!(engine = %found.kind, socket = %found.path.display(), "detected engine socket");
                    connect_socket(&found.path.to_string_lossy())?
                }
                None => Docker::connect_with_local_defaults()
                    .map_err(|e| EngineError::Connection(e.to_string()))?,
            },
        };
        Ok(Arc::new(BollardEngine::new(client)))
    }
}

#[cfg(unix)]
fn connect_socket(path: &str) -> Result<Docker, EngineError> {
    Docker::connect_with_unix(path, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        .map_err(|e| EngineError::Connection(e.to_string()))
}

#[cfg(windows)]
fn connect_socket(path: &str) -> Result<Docker, EngineError> {
    Docker::connect_with_named_pipe(path, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        .map_err(|e| EngineError::Connection(e.to_string()))
}
