// ABOUTME: Image reference made of a repository and an optional tag.
// ABOUTME: Handles formats like org/image and org/image:v1.2.3.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("no local tag for image: {0}")]
    NoTag(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    repository: String,
    tag: Option<String>,
}

impl ImageRef {
    /// Create a reference to a repository without a tag.
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: None,
        }
    }

    pub fn parse(input: &str) -> Result<Self, ImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImageRefError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_') {
                return Err(ImageRefError::InvalidChar(c));
            }
        }

        // A colon followed by a slash belongs to a registry port, not a tag
        match input.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') && !tag.is_empty() => Ok(Self {
                repository: repository.to_string(),
                tag: Some(tag.to_string()),
            }),
            _ => Ok(Self::new(input)),
        }
    }

    /// Return a copy of this reference pointing at `tag`.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            repository: self.repository.clone(),
            tag: Some(tag.into()),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Render `repository:tag`, which requires a resolved tag.
    pub fn full_name(&self) -> Result<String, ImageRefError> {
        match self.tag {
            Some(ref tag) => Ok(format!("{}:{}", self.repository, tag)),
            None => Err(ImageRefError::NoTag(self.repository.clone())),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        Ok(())
    }
}
