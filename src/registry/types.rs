// ABOUTME: Wire types for the registry tag listing endpoint.
// ABOUTME: Only the fields needed to rank tags and size pulls are typed.

use serde::Deserialize;

/// Metadata for one tag as listed by the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagMeta {
    pub name: String,
    /// Compressed size of the image in bytes.
    #[serde(default)]
    pub full_size: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
}

/// One page of `GET /v2/repositories/{image}/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagPage {
    #[serde(default)]
    pub results: Vec<TagMeta>,
    #[serde(default)]
    pub next: Option<String>,
}
