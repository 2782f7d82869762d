// ABOUTME: Local container engine socket detection.
// ABOUTME: Checks Podman sockets, the system Docker socket, then the Docker Desktop user socket.

use std::path::{Path, PathBuf};

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Which engine a detected socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Docker,
    Podman,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Docker => write!(f, "docker"),
            EngineKind::Podman => write!(f, "podman"),
        }
    }
}

/// A socket an engine is listening on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedSocket {
    pub kind: EngineKind,
    pub path: PathBuf,
}

/// Find an engine socket on this machine.
///
/// Detection order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
/// 4. Docker Desktop user socket (`~/.docker/run/docker.sock`)
///
/// Returns `None` when nothing is found; the client library's own defaults
/// (including named pipes on Windows) are used in that case.
pub fn detect_local() -> Option<DetectedSocket> {
    candidates()
        .into_iter()
        .find(|candidate| candidate.path.exists())
}

fn candidates() -> Vec<DetectedSocket> {
    let mut found = Vec::new();

    if let Some(uid) = current_uid() {
        found.push(DetectedSocket {
            kind: EngineKind::Podman,
            path: PathBuf::from(format!("/run/user/{}/podman/podman.sock", uid)),
        });
    }
    found.push(DetectedSocket {
        kind: EngineKind::Podman,
        path: PathBuf::from(ROOTFUL_PODMAN),
    });
    found.push(DetectedSocket {
        kind: EngineKind::Docker,
        path: PathBuf::from(DOCKER_SOCKET),
    });
    if let Some(home) = dirs::home_dir() {
        found.push(DetectedSocket {
            kind: EngineKind::Docker,
            path: home.join(".docker/run/docker.sock"),
        });
    }

    found
}

fn current_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string(Path::new("/proc/self/status"))
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn podman_is_preferred_over_docker() {
        let order: Vec<EngineKind> = candidates().iter().map(|c| c.kind).collect();
        let first_docker = order.iter().position(|k| *k == EngineKind::Docker).unwrap();
        assert!(order[..first_docker].iter().all(|k| *k == EngineKind::Podman));
    }
}
