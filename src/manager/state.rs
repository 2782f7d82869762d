// ABOUTME: State values owned by the container manager.
// ABOUTME: Current tag, last launch failure and the published snapshot.

use crate::engine::ContainerStats;
use crate::types::StatusChange;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The tag the manager currently considers in use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CurrentTag {
    /// The engine is unreachable or the tag could not be resolved.
    #[default]
    Unknown,
    /// The engine is reachable but no tag of the image is present locally.
    Absent,
    Known(String),
}

impl CurrentTag {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            CurrentTag::Known(tag) => Some(tag),
            _ => None,
        }
    }
}

impl From<Option<String>> for CurrentTag {
    fn from(tag: Option<String>) -> Self {
        match tag {
            Some(tag) => CurrentTag::Known(tag),
            None => CurrentTag::Absent,
        }
    }
}

impl fmt::Display for CurrentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentTag::Unknown => f.write_str("unknown"),
            CurrentTag::Absent => f.write_str("none"),
            CurrentTag::Known(tag) => f.write_str(tag),
        }
    }
}

impl Serialize for CurrentTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How the last failed launch is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    #[default]
    None,
    /// The engine refused to bind-mount the data directory.
    FileShareDenied,
    Unknown,
}

/// The most recent failed start attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LastFailure {
    pub kind: FailureKind,
    pub detail: String,
    pub at: Option<DateTime<Utc>>,
}

impl LastFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            at: Some(Utc::now()),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == FailureKind::None
    }
}

/// A copy of everything the manager publishes.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub status: StatusChange,
    pub tag: CurrentTag,
    pub available: bool,
    pub last_failure: LastFailure,
    pub total_pull_size: Option<u64>,
    pub final_stats: Option<ContainerStats>,
}
