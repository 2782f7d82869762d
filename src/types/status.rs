// ABOUTME: Container status values and the previous/current status pair.
// ABOUTME: Mirrors engine container states plus synthetic unknown/inactive values.

use serde::Serialize;
use std::fmt;

/// Observed status of the managed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// The engine is unreachable, so nothing is known.
    Unknown,
    /// No container with the managed name exists.
    Inactive,
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    /// Any other state string reported by the engine, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

impl ContainerStatus {
    /// Map an engine state string onto a status.
    pub fn from_engine_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "paused" => ContainerStatus::Paused,
            "restarting" => ContainerStatus::Restarting,
            "removing" => ContainerStatus::Removing,
            "exited" => ContainerStatus::Exited,
            "dead" => ContainerStatus::Dead,
            _ => ContainerStatus::Other(state.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContainerStatus::Unknown => "unknown",
            ContainerStatus::Inactive => "inactive",
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Dead => "dead",
            ContainerStatus::Other(s) => s,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last status transition, so observers can see what changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub previous: ContainerStatus,
    pub current: ContainerStatus,
}

impl StatusChange {
    /// Advance to `next`, returning `None` when the status is unchanged.
    pub fn advance(&self, next: ContainerStatus) -> Option<StatusChange> {
        if self.current == next {
            return None;
        }
        Some(StatusChange {
            previous: self.current.clone(),
            current: next,
        })
    }
}

impl Default for StatusChange {
    fn default() -> Self {
        Self {
            previous: ContainerStatus::Unknown,
            current: ContainerStatus::Unknown,
        }
    }
}
