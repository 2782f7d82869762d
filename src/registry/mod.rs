// ABOUTME: Remote registry access for image tag listings.
// ABOUTME: Paginated fetches, TTL-cached catalogs and semver tag ranking.

mod cache;
mod client;
mod error;
mod source;
mod types;

pub use cache::{MetaMemo, TagCatalog};
pub use client::{HttpTagFetcher, TagPageFetcher};
pub use error::RegistryError;
pub use source::{DEFAULT_CATALOG_TTL, DEFAULT_META_ENTRIES, RegistryOptions, RegistryTagSource};
pub use types::{TagMeta, TagPage};
