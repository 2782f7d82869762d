// ABOUTME: Error types for registry tag lookups.
// ABOUTME: Separates transport failures from a tag that is simply absent.

/// Errors from querying the remote registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("registry returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to decode registry response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("tag was not found: {image}:{tag}")]
    NotFound { image: String, tag: String },
}

impl RegistryError {
    /// True when the tag is absent rather than the registry being unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}
