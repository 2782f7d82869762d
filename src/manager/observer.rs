// ABOUTME: Change-notification channels for the manager's published state.
// ABOUTME: One watch channel per field; subscribers wake only when a value changes.

use super::state::{CurrentTag, LastFailure, ManagerSnapshot};
use crate::engine::ContainerStats;
use crate::types::{ContainerStatus, StatusChange};
use tokio::sync::watch;

/// Publish-on-change holders for every observable field.
pub struct Observers {
    status: watch::Sender<StatusChange>,
    tag: watch::Sender<CurrentTag>,
    available: watch::Sender<bool>,
    progress: watch::Sender<Option<f64>>,
    last_failure: watch::Sender<LastFailure>,
    total_pull_size: watch::Sender<Option<u64>>,
    final_stats: watch::Sender<Option<ContainerStats>>,
}

fn replace_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    })
}

impl Observers {
    pub fn new() -> Self {
        Self {
            status: watch::channel(StatusChange::default()).0,
            tag: watch::channel(CurrentTag::Unknown).0,
            available: watch::channel(false).0,
            progress: watch::channel(None).0,
            last_failure: watch::channel(LastFailure::default()).0,
            total_pull_size: watch::channel(None).0,
            final_stats: watch::channel(None).0,
        }
    }

    /// Move the status pair forward. Returns whether anything changed.
    pub(crate) fn set_status(&self, next: ContainerStatus) -> bool {
        self.status
            .send_if_modified(|change| match change.advance(next) {
                Some(advanced) => {
                    *change = advanced;
                    true
                }
                None => false,
            })
    }

    pub(crate) fn set_available(&self, available: bool) -> bool {
        replace_if_changed(&self.available, available)
    }

    pub(crate) fn set_tag(&self, tag: CurrentTag) -> bool {
        replace_if_changed(&self.tag, tag)
    }

    pub(crate) fn set_progress(&self, percent: Option<f64>) -> bool {
        replace_if_changed(&self.progress, percent)
    }

    pub(crate) fn set_last_failure(&self, failure: LastFailure) -> bool {
        replace_if_changed(&self.last_failure, failure)
    }

    pub(crate) fn set_total_pull_size(&self, size: Option<u64>) -> bool {
        replace_if_changed(&self.total_pull_size, size)
    }

    pub(crate) fn set_final_stats(&self, stats: Option<ContainerStats>) {
        self.final_stats.send_replace(stats);
    }

    pub fn status(&self) -> StatusChange {
        self.status.borrow().clone()
    }

    pub fn tag(&self) -> CurrentTag {
        self.tag.borrow().clone()
    }

    pub fn available(&self) -> bool {
        *self.available.borrow()
    }

    pub fn progress(&self) -> Option<f64> {
        *self.progress.borrow()
    }

    pub fn last_failure(&self) -> LastFailure {
        self.last_failure.borrow().clone()
    }

    pub fn total_pull_size(&self) -> Option<u64> {
        *self.total_pull_size.borrow()
    }

    pub fn final_stats(&self) -> Option<ContainerStats> {
        self.final_stats.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusChange> {
        self.status.subscribe()
    }

    pub fn subscribe_tag(&self) -> watch::Receiver<CurrentTag> {
        self.tag.subscribe()
    }

    pub fn subscribe_available(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<f64>> {
        self.progress.subscribe()
    }

    pub fn subscribe_last_failure(&self) -> watch::Receiver<LastFailure> {
        self.last_failure.subscribe()
    }

    pub fn subscribe_total_pull_size(&self) -> watch::Receiver<Option<u64>> {
        self.total_pull_size.subscribe()
    }

    pub fn subscribe_final_stats(&self) -> watch::Receiver<Option<ContainerStats>> {
        self.final_stats.subscribe()
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            status: self.status(),
            tag: self.tag(),
            available: self.available(),
            last_failure: self.last_failure(),
            total_pull_size: self.total_pull_size(),
            final_stats: self.final_stats(),
        }
    }
}

impl Default for Observers {
    fn default() -> Self {
        Self::new()
    }
}
