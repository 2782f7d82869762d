// ABOUTME: Configuration types and parsing for labs-launcher.yml.
// ABOUTME: Every field has a default, so a missing file means the built-in settings.

mod deserialize;
mod init;

pub use init::init_config;

use crate::error::{Error, Result};
use crate::manager::{
    DEFAULT_CONTAINER_CMD, DEFAULT_DATA_BIND, DEFAULT_HEARTBEAT, DEFAULT_SERVER_NAME,
    DEFAULT_TAG_PREFIX, LaunchRequest, ManagerSettings,
};
use crate::registry::{DEFAULT_CATALOG_TTL, DEFAULT_META_ENTRIES};
use crate::types::ImageRef;
use deserialize::{deserialize_command, deserialize_fixed_tag};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "labs-launcher.yml";
pub const CONFIG_FILENAME_ALT: &str = "labs-launcher.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".labs-launcher/config.yml";

pub const DEFAULT_REGISTRY: &str = "hub.docker.com";
pub const DEFAULT_IMAGE: &str = "ontresearch/nanolabs-notebook";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_AUX_PORT: u16 = 8889;
pub const DEFAULT_TOKEN: &str = "EPI2MELabs";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry host (or base URL) listing the image's tags.
    pub registry: String,

    /// Image repository without a tag.
    pub image: String,

    /// Pin this tag instead of following the registry. Empty means unset.
    #[serde(deserialize_with = "deserialize_fixed_tag")]
    pub fixed_tag: Option<String>,

    pub server_name: String,

    /// Host directory mounted into the container.
    pub data_mount: String,

    /// Mount point inside the container.
    pub data_bind: String,

    pub port: u16,
    pub aux_port: u16,
    pub token: String,

    /// Base command; a string is split like a shell would.
    #[serde(deserialize_with = "deserialize_command")]
    pub container_cmd: Vec<String>,

    /// Publish ports on loopback only.
    #[serde(alias = "docker_restrict")]
    pub host_only: bool,

    #[serde(with = "humantime_serde")]
    pub heartbeat: Duration,

    pub cache: CacheConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a fetched tag catalog is reused.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub meta_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CATALOG_TTL,
            meta_entries: DEFAULT_META_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine socket path; detected when unset.
    pub socket: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            fixed_tag: None,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            data_mount: default_data_mount(),
            data_bind: DEFAULT_DATA_BIND.to_string(),
            port: DEFAULT_PORT,
            aux_port: DEFAULT_AUX_PORT,
            token: DEFAULT_TOKEN.to_string(),
            container_cmd: DEFAULT_CONTAINER_CMD.iter().map(|s| s.to_string()).collect(),
            host_only: true,
            heartbeat: DEFAULT_HEARTBEAT,
            cache: CacheConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

fn default_data_mount() -> String {
    dirs::home_dir()
        .map(|home| home.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is valid and means all defaults
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load from `explicit` if given, otherwise discover from `dir`.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(Error::ConfigNotFound(path.to_path_buf())),
            Some(path) => Self::load(path),
            None => Self::discover(dir),
        }
    }

    /// Load the first config file found for `dir`, or the defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Candidate files in `dir`, then the per-user config file.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        let mut candidates = vec![
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];
        if let Some(user) = user_config_path() {
            candidates.push(user);
        }
        candidates.into_iter().find(|path| path.exists())
    }

    fn validate(&self) -> Result<()> {
        let image = ImageRef::parse(&self.image).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if image.tag().is_some() {
            return Err(Error::InvalidConfig(format!(
                "image must not include a tag (use fixed_tag): {}",
                self.image
            )));
        }
        if self.port == 0 || self.aux_port == 0 {
            return Err(Error::InvalidConfig("ports must be non-zero".to_string()));
        }
        if self.server_name.trim().is_empty() {
            return Err(Error::InvalidConfig("server_name cannot be empty".to_string()));
        }
        if self.heartbeat.is_zero() {
            return Err(Error::InvalidConfig("heartbeat must be positive".to_string()));
        }
        Ok(())
    }

    /// The registry base URL, defaulting to HTTPS for a bare host.
    pub fn registry_url(&self) -> String {
        let registry = self.registry.trim_end_matches('/');
        if registry.starts_with("http://") || registry.starts_with("https://") {
            registry.to_string()
        } else {
            format!("https://{}", registry)
        }
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            repository: self.image.clone(),
            server_name: self.server_name.clone(),
            data_bind: self.data_bind.clone(),
            container_cmd: self.container_cmd.clone(),
            host_only: self.host_only,
            fixed_tag: self.fixed_tag.clone(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }

    pub fn launch_request(&self) -> LaunchRequest {
        LaunchRequest {
            mount: self.data_mount.clone(),
            token: self.token.clone(),
            port: self.port,
            aux_port: self.aux_port,
        }
    }
}

/// `<user config dir>/labs-launcher/config.yml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("labs-launcher").join("config.yml"))
}
