// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, defaults, file discovery and init scaffolding.

use labs_launcher::config::*;
use labs_launcher::error::Error;
use std::fs;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.registry, DEFAULT_REGISTRY);
        assert_eq!(config.image, DEFAULT_IMAGE);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.aux_port, DEFAULT_AUX_PORT);
        assert_eq!(config.token, DEFAULT_TOKEN);
        assert_eq!(config.fixed_tag, None);
        assert!(config.host_only);
        assert_eq!(config.heartbeat, Duration::from_secs(5));
        assert_eq!(config.container_cmd[0], "start-notebook.sh");
        assert_eq!(config.engine.socket, None);
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
registry: registry.example.com
image: labs/notebook
fixed_tag: v1.4.0
server_name: labs
data_mount: /data
data_bind: /work/
port: 9000
aux_port: 9001
token: secret
host_only: false
heartbeat: 2s
cache:
  ttl: 10m
  meta_entries: 8
engine:
  socket: /run/user/1000/docker.sock
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.registry_url(), "https://registry.example.com");
        assert_eq!(config.fixed_tag.as_deref(), Some("v1.4.0"));
        assert_eq!(config.heartbeat, Duration::from_secs(2));
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
        assert_eq!(config.cache.meta_entries, 8);
        assert_eq!(
            config.engine.socket.as_deref(),
            Some("/run/user/1000/docker.sock")
        );

        let request = config.launch_request();
        assert_eq!(request.mount, "/data");
        assert_eq!(request.port, 9000);
        assert_eq!(request.aux_port, 9001);
        assert_eq!(request.token, "secret");

        let settings = config.manager_settings();
        assert_eq!(settings.repository, "labs/notebook");
        assert_eq!(settings.server_name, "labs");
        assert_eq!(settings.data_bind, "/work/");
        assert!(!settings.host_only);
    }

    #[test]
    fn docker_restrict_is_an_alias_for_host_only() {
        let config = Config::from_yaml("docker_restrict: false").unwrap();
        assert!(!config.host_only);
    }

    #[test]
    fn blank_fixed_tag_means_unset() {
        let config = Config::from_yaml("fixed_tag: \"  \"").unwrap();
        assert_eq!(config.fixed_tag, None);
    }

    #[test]
    fn command_line_is_split_like_a_shell() {
        let config =
            Config::from_yaml(r#"container_cmd: "start.sh --opt='a b' --flag""#).unwrap();
        assert_eq!(config.container_cmd, vec!["start.sh", "--opt=a b", "--flag"]);
    }

    #[test]
    fn command_list_is_taken_verbatim() {
        let yaml = r#"
container_cmd:
  - start.sh
  - "--opt=a b"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.container_cmd, vec!["start.sh", "--opt=a b"]);
    }

    #[test]
    fn registry_url_keeps_explicit_scheme() {
        let config = Config::from_yaml("registry: http://localhost:5000/").unwrap();
        assert_eq!(config.registry_url(), "http://localhost:5000");
    }
}

mod validation {
    use super::*;

    #[test]
    fn image_with_tag_is_rejected() {
        let err = Config::from_yaml("image: labs/notebook:v1").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("fixed_tag")));
    }

    #[test]
    fn zero_port_is_rejected() {
        let err = Config::from_yaml("port: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn blank_server_name_is_rejected() {
        let err = Config::from_yaml("server_name: \" \"").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        let err = Config::from_yaml("heartbeat: 0s").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = Config::from_yaml("port: [").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let err = Config::from_yaml("heartbeat: soon").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_primary_file_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "port: 9100").unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "port: 9200").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn finds_alternate_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "port: 9200").unwrap();

        assert_eq!(
            Config::find(dir.path()),
            Some(dir.path().join(CONFIG_FILENAME_ALT))
        );
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");

        let err = Config::resolve(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(path) if path == missing));
    }

    #[test]
    fn explicit_path_wins_over_discovery() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "port: 9100").unwrap();
        let explicit = dir.path().join("other.yml");
        fs::write(&explicit, "port: 9300").unwrap();

        let config = Config::resolve(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.port, 9300);
    }

    #[test]
    fn user_config_lives_under_its_own_directory() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("labs-launcher/config.yml"));
        }
    }
}

mod init {
    use super::*;

    #[test]
    fn template_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path(), Some("labs/custom"), false).unwrap();

        assert_eq!(path, dir.path().join(CONFIG_FILENAME));
        let config = Config::load(&path).unwrap();
        assert_eq!(config.image, "labs/custom");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "port: 9100").unwrap();

        let err = init_config(dir.path(), None, false).unwrap_err();
        assert!(matches!(err, Error::ConfigExists(_)));

        init_config(dir.path(), None, true).unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_image_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_config(dir.path(), Some("labs/notebook:v1"), false).is_err());
        assert!(!dir.path().join(CONFIG_FILENAME).exists());
    }
}
