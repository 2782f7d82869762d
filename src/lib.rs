// ABOUTME: Library root for labs-launcher - exposes the container manager and its parts.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod output;
pub mod puller;
pub mod registry;
pub mod types;
pub mod version;
