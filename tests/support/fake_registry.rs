// ABOUTME: Scripted registry tag listing keyed by page URL.
// ABOUTME: Counts requests so tests can assert on cache behaviour.

use async_trait::async_trait;
use labs_launcher::registry::{
    RegistryError, RegistryOptions, RegistryTagSource, TagMeta, TagPage, TagPageFetcher,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub const BASE_URL: &str = "https://registry.test";

/// URL of the first catalog page for `image`.
pub fn first_page(image: &str) -> String {
    format!("{BASE_URL}/v2/repositories/{image}/tags?page_size=100")
}

pub fn tag(name: &str, full_size: Option<u64>) -> TagMeta {
    TagMeta {
        name: name.to_string(),
        full_size,
        last_updated: None,
        digest: None,
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, TagPage>>,
    requests: AtomicUsize,
    failing: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tags` for `image` as a single page.
    pub fn with_tags(image: &str, tags: &[(&str, Option<u64>)]) -> Self {
        let fetcher = Self::new();
        fetcher.set_page(
            &first_page(image),
            tags.iter().map(|(n, s)| tag(n, *s)).collect(),
            None,
        );
        fetcher
    }

    pub fn set_page(&self, url: &str, results: Vec<TagMeta>, next: Option<&str>) {
        self.pages.lock().insert(
            url.to_string(),
            TagPage {
                results,
                next: next.map(str::to_string),
            },
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Hold fetches of `url` until the returned notify is signalled.
    pub fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(url.to_string(), gate.clone());
        gate
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagPageFetcher for FakeFetcher {
    async fn fetch_page(&self, url: &str) -> Result<TagPage, RegistryError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.pages
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| RegistryError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// A tag source over `fetcher` with default cache settings.
pub fn source(fetcher: Arc<FakeFetcher>) -> RegistryTagSource {
    RegistryTagSource::new(fetcher, RegistryOptions::new(BASE_URL))
}
