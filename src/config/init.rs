// ABOUTME: Config scaffolding for new installs.
// ABOUTME: Creates a labs-launcher.yml template listing every setting.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, image: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::ConfigExists(config_path));
    }

    let mut config = Config::default();
    if let Some(image) = image {
        config.image = image.to_string();
    }

    let yaml = generate_template_yaml(&config);
    // Reject anything the loader would refuse
    Config::from_yaml(&yaml)?;
    std::fs::write(&config_path, yaml)?;

    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"registry: {}
image: {}
# Pin a tag instead of following the newest registry tag
# fixed_tag: v1.0.0
server_name: {}
data_mount: {:?}
data_bind: {}
port: {}
aux_port: {}
token: {}
# Publish ports on 127.0.0.1 only
host_only: {}
heartbeat: {}s
cache:
  ttl: {}s
  meta_entries: {}
# engine:
#   socket: /var/run/docker.sock
"#,
        config.registry,
        config.image,
        config.server_name,
        config.data_mount,
        config.data_bind,
        config.port,
        config.aux_port,
        config.token,
        config.host_only,
        config.heartbeat.as_secs(),
        config.cache.ttl.as_secs(),
        config.cache.meta_entries,
    )
}
