// ABOUTME: Engine object identifiers tagged with the kind of object they name.
// ABOUTME: Keeps container and image ids from being passed to the wrong call.

use serde::{Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

pub enum ContainerMarker {}
pub enum ImageMarker {}

/// Identifier assigned by the container engine.
#[must_use = "ids name engine objects and should not be ignored"]
pub struct EngineId<T> {
    value: String,
    _kind: PhantomData<T>,
}

impl<T> EngineId<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The 12 character form the engine CLI prints, without any `sha256:` prefix.
    pub fn short(&self) -> &str {
        let bare = self.value.strip_prefix("sha256:").unwrap_or(&self.value);
        bare.get(..12).unwrap_or(bare)
    }
}

// Written by hand so that the marker type needs no trait bounds.

impl<T> Clone for EngineId<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for EngineId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for EngineId<T> {}

impl<T> fmt::Debug for EngineId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EngineId").field(&self.value).finish()
    }
}

impl<T> fmt::Display for EngineId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for EngineId<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

pub type ContainerId = EngineId<ContainerMarker>;
pub type ImageId = EngineId<ImageMarker>;
