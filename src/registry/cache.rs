// ABOUTME: Time-bounded caches for registry data.
// ABOUTME: TagCatalog holds one image's full listing; MetaMemo keeps recent tag lookups.

use super::types::TagMeta;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Full tag listing for one image, stamped with when it was fetched.
#[derive(Debug, Clone)]
pub struct TagCatalog {
    tags: Arc<[TagMeta]>,
    fetched_at: Instant,
}

impl TagCatalog {
    pub fn new(tags: Vec<TagMeta>) -> Self {
        Self {
            tags: tags.into(),
            fetched_at: Instant::now(),
        }
    }

    pub fn tags(&self) -> &[TagMeta] {
        &self.tags
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    pub fn find(&self, name: &str) -> Option<&TagMeta> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// A catalog older than `ttl` must be fetched again.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

struct MemoEntry {
    image: String,
    tag: String,
    meta: TagMeta,
    fetched_at: Instant,
}

/// Most-recently-used memo of `(image, tag)` metadata lookups.
///
/// Entries expire together with the catalog they were read from, so the memo
/// never serves metadata older than the catalog TTL.
pub struct MetaMemo {
    capacity: usize,
    entries: VecDeque<MemoEntry>,
}

impl MetaMemo {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, image: &str, tag: &str, ttl: Duration) -> Option<TagMeta> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.image == image && e.tag == tag)?;
        let entry = self.entries.remove(pos)?;
        if entry.fetched_at.elapsed() >= ttl {
            return None;
        }
        let meta = entry.meta.clone();
        self.entries.push_front(entry);
        Some(meta)
    }

    pub fn insert(&mut self, image: &str, meta: TagMeta, fetched_at: Instant) {
        if self.capacity == 0 {
            return;
        }
        self.entries
            .retain(|e| !(e.image == image && e.tag == meta.name));
        self.entries.push_front(MemoEntry {
            image: image.to_string(),
            tag: meta.name.clone(),
            meta,
            fetched_at,
        });
        self.entries.truncate(self.capacity);
    }
}
