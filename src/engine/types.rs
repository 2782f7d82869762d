// ABOUTME: Engine-facing value types shared by the engine trait and its users.
// ABOUTME: RunSpec, ContainerSummary, ImageInfo, ContainerStats, PullEvent, etc.

use crate::types::{ContainerId, ContainerStatus, ImageId, ImageRef};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Version details returned by the engine's liveness query.
#[derive(Debug, Clone, Default)]
pub struct EngineVersion {
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}

/// A container as listed by the engine.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
}

/// A locally present image.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub id: ImageId,
    pub reference: ImageRef,
    pub size: Option<u64>,
}

/// Everything needed to create and start a detached container.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub volumes: Vec<VolumeBind>,
}

/// Publishes a container port on the same host port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub port: u16,
    /// Host interface to bind; `None` binds all interfaces.
    pub host_ip: Option<String>,
}

/// A read-write or read-only bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

/// One resource usage snapshot of a container.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStats {
    pub read_at: DateTime<Utc>,
    pub memory_usage: Option<u64>,
    pub memory_limit: Option<u64>,
    pub cpu_percent: Option<f64>,
    /// The engine's full response, for anything not summarised above.
    pub raw: serde_json::Value,
}

impl ContainerStats {
    /// Summarise the engine's JSON stats document.
    pub fn from_json(raw: serde_json::Value) -> Self {
        let u64_at = |ptr: &str| raw.pointer(ptr).and_then(serde_json::Value::as_u64);

        let cpu_percent = match (
            u64_at("/cpu_stats/cpu_usage/total_usage"),
            u64_at("/precpu_stats/cpu_usage/total_usage"),
            u64_at("/cpu_stats/system_cpu_usage"),
            u64_at("/precpu_stats/system_cpu_usage"),
        ) {
            (Some(cpu), Some(pre_cpu), Some(sys), Some(pre_sys)) if sys > pre_sys => {
                let cpus = u64_at("/cpu_stats/online_cpus").unwrap_or(1) as f64;
                let cpu_delta = cpu.saturating_sub(pre_cpu) as f64;
                let sys_delta = (sys - pre_sys) as f64;
                Some(cpu_delta / sys_delta * cpus * 100.0)
            }
            _ => None,
        };

        Self {
            read_at: Utc::now(),
            memory_usage: u64_at("/memory_stats/usage"),
            memory_limit: u64_at("/memory_stats/limit"),
            cpu_percent,
            raw,
        }
    }
}

/// One progress message from an image pull stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullEvent {
    /// Layer id the event refers to, when it refers to a layer.
    pub id: Option<String>,
    pub status: Option<String>,
    pub current: Option<u64>,
    pub total: Option<u64>,
}

impl PullEvent {
    /// Bytes downloaded so far for a layer, if this is a download progress event.
    pub fn downloading(&self) -> Option<(&str, u64)> {
        match (self.status.as_deref(), self.id.as_deref(), self.current) {
            (Some("Downloading"), Some(id), Some(current)) => Some((id, current)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_summary_computes_cpu_percent() {
        let stats = ContainerStats::from_json(json!({
            "cpu_stats": {
                "cpu_usage": { "total_usage": 300 },
                "system_cpu_usage": 2000,
                "online_cpus": 2
            },
            "precpu_stats": {
                "cpu_usage": { "total_usage": 100 },
                "system_cpu_usage": 1000
            },
            "memory_stats": { "usage": 4096, "limit": 8192 }
        }));
        assert_eq!(stats.memory_usage, Some(4096));
        assert_eq!(stats.memory_limit, Some(8192));
        assert_eq!(stats.cpu_percent, Some(40.0));
    }

    #[test]
    fn stats_summary_tolerates_missing_fields() {
        let stats = ContainerStats::from_json(json!({}));
        assert!(stats.memory_usage.is_none());
        assert!(stats.cpu_percent.is_none());
    }

    #[test]
    fn only_downloading_events_carry_layer_progress() {
        let event = PullEvent {
            id: Some("abc".to_string()),
            status: Some("Downloading".to_string()),
            current: Some(10),
            total: Some(100),
        };
        assert_eq!(event.downloading(), Some(("abc", 10)));

        let extracting = PullEvent {
            status: Some("Extracting".to_string()),
            ..event
        };
        assert_eq!(extracting.downloading(), None);
    }
}
