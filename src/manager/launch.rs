// ABOUTME: Builds the engine run spec for the notebook server container.
// ABOUTME: Appends the runtime token and port and maps ports one-to-one.

use super::ManagerSettings;
use crate::engine::{PortBinding, RunSpec, VolumeBind};
use std::collections::HashMap;

const LOOPBACK: &str = "127.0.0.1";

/// Per-launch inputs chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Host directory mounted into the container.
    pub mount: String,
    /// Access token for the notebook server.
    pub token: String,
    pub port: u16,
    pub aux_port: u16,
}

/// The run spec for `image` under `settings`.
///
/// Ports are published on the same host port because the notebook server
/// embeds its own port in the links it generates.
pub fn build_run_spec(settings: &ManagerSettings, image: &str, request: &LaunchRequest) -> RunSpec {
    let mut command = settings.container_cmd.clone();
    command.push(format!("--NotebookApp.token={}", request.token));
    command.push(format!("--port={}", request.port));

    let host_ip = settings.host_only.then(|| LOOPBACK.to_string());
    let mut ports = vec![PortBinding {
        port: request.port,
        host_ip: host_ip.clone(),
    }];
    if request.aux_port != request.port {
        ports.push(PortBinding {
            port: request.aux_port,
            host_ip,
        });
    }

    let mut env = HashMap::new();
    env.insert("JUPYTER_ENABLE_LAB".to_string(), "yes".to_string());

    RunSpec {
        name: settings.server_name.clone(),
        image: image.to_string(),
        command,
        env,
        ports,
        volumes: vec![VolumeBind {
            source: request.mount.clone(),
            target: settings.data_bind.clone(),
            read_only: false,
        }],
    }
}
