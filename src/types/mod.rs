// ABOUTME: Domain types shared by the engine, registry and manager layers.
// ABOUTME: Image references, container status values and typed engine ids.

mod id;
mod image_ref;
mod status;

pub use id::{ContainerId, EngineId, ImageId};
pub use image_ref::{ImageRef, ImageRefError};
pub use status::{ContainerStatus, StatusChange};
