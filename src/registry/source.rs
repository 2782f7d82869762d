// ABOUTME: Remote tag source with paginated catalog fetches and TTL caching.
// ABOUTME: Ranks semver tags newest first and looks up per-tag metadata.

use super::cache::{MetaMemo, TagCatalog};
use super::client::TagPageFetcher;
use super::error::RegistryError;
use super::types::TagMeta;
use crate::version;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default lifetime of a cached catalog.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(300);

/// Default number of memoised `(image, tag)` lookups.
pub const DEFAULT_META_ENTRIES: usize = 5;

const PAGE_SIZE: u32 = 100;

/// One image's cached catalog. Held across a fetch so concurrent callers
/// for that image share a single request.
type CatalogSlot = Arc<tokio::sync::Mutex<Option<TagCatalog>>>;

/// Options for a [`RegistryTagSource`].
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Base URL of the registry API, e.g. `https://hub.docker.com`.
    pub base_url: String,
    /// How long a fetched catalog is reused.
    pub catalog_ttl: Duration,
    /// How many tag metadata lookups are memoised.
    pub meta_entries: usize,
}

impl RegistryOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            catalog_ttl: DEFAULT_CATALOG_TTL,
            meta_entries: DEFAULT_META_ENTRIES,
        }
    }
}

/// Lists and describes the tags of images hosted on a remote registry.
pub struct RegistryTagSource {
    fetcher: Arc<dyn TagPageFetcher>,
    options: RegistryOptions,
    catalogs: parking_lot::Mutex<HashMap<String, CatalogSlot>>,
    memo: parking_lot::Mutex<MetaMemo>,
}

impl RegistryTagSource {
    pub fn new(fetcher: Arc<dyn TagPageFetcher>, options: RegistryOptions) -> Self {
        let memo = MetaMemo::new(options.meta_entries);
        Self {
            fetcher,
            options,
            catalogs: parking_lot::Mutex::new(HashMap::new()),
            memo: parking_lot::Mutex::new(memo),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Tags of `image` starting with `prefix` that parse as semver, newest first.
    pub async fn list_tags(&self, image: &str, prefix: &str) -> Result<Vec<String>, RegistryError> {
        let catalog = self.catalog(image).await?;
        Ok(version::sort_descending(catalog.names(), prefix))
    }

    /// Metadata for an exact tag name.
    pub async fn get_tag_meta(&self, image: &str, tag: &str) -> Result<TagMeta, RegistryError> {
        let memoised = self.memo.lock().get(image, tag, self.options.catalog_ttl);
        if let Some(meta) = memoised {
            debug!(image, tag, "tag metadata served from memo");
            return Ok(meta);
        }

        let catalog = self.catalog(image).await?;
        let meta = catalog
            .find(tag)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                image: image.to_string(),
                tag: tag.to_string(),
            })?;

        self.memo
            .lock()
            .insert(image, meta.clone(), catalog.fetched_at());
        Ok(meta)
    }

    /// The full catalog for `image`, fetched again only once the cached copy expires.
    ///
    /// A fetch in flight for one image never delays lookups for another.
    pub async fn catalog(&self, image: &str) -> Result<TagCatalog, RegistryError> {
        let slot = Arc::clone(self.catalogs.lock().entry(image.to_string()).or_default());
        let mut cached = slot.lock().await;

        if let Some(catalog) = cached.as_ref()
            && catalog.is_fresh(self.options.catalog_ttl)
        {
            debug!(image, "tag catalog served from cache");
            return Ok(catalog.clone());
        }

        let tags = self.fetch_all(image).await?;
        debug!(image, count = tags.len(), "fetched tag catalog");
        let catalog = TagCatalog::new(tags);
        *cached = Some(catalog.clone());
        Ok(catalog)
    }

    /// Follow `next` links until they run out or lead back to a page already read.
    async fn fetch_all(&self, image: &str) -> Result<Vec<TagMeta>, RegistryError> {
        let mut url = format!(
            "{}/v2/repositories/{}/tags?page_size={}",
            self.options.base_url.trim_end_matches('/'),
            image,
            PAGE_SIZE
        );
        let mut visited = HashSet::new();
        let mut tags = Vec::new();

        loop {
            let page = self.fetcher.fetch_page(&url).await?;
            tags.extend(page.results);
            visited.insert(url);
            match page.next {
                Some(next) if !visited.contains(&next) => url = next,
                Some(next) => {
                    warn!(image, next = %next, pages = visited.len(), "tag pagination loops back; stopping");
                    break;
                }
                None => break,
            }
        }

        Ok(tags)
    }
}
