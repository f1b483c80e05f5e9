use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happens when a typed map object has missing or malformed properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthoringPolicy {
    /// Skip the object, log a warning, keep loading.
    #[default]
    Lenient,
    /// Abort `init()` with the first authoring error.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    pub authoring_policy: AuthoringPolicy,
    pub evict_tile_cache_on_unload: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            authoring_policy: AuthoringPolicy::Lenient,
            evict_tile_cache_on_unload: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl WorldConfig {
    /// Reads a JSON config; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, WorldConfig>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                json_path,
                source: error.into_inner(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = TempDir::new().expect("temp");
        let config = WorldConfig::load(&temp.path().join("world.json")).expect("config");
        assert_eq!(config, WorldConfig::default());
        assert!(config.evict_tile_cache_on_unload);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("world.json");
        fs::write(&path, r#"{ "authoring_policy": "strict" }"#).expect("write");
        let config = WorldConfig::load(&path).expect("config");
        assert_eq!(config.authoring_policy, AuthoringPolicy::Strict);
        assert!(config.evict_tile_cache_on_unload);
    }

    #[test]
    fn parse_error_names_json_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("world.json");
        fs::write(&path, r#"{ "authoring_policy": "sometimes" }"#).expect("write");
        let err = WorldConfig::load(&path).expect_err("err");
        match err {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "authoring_policy"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("world.json");
        fs::write(&path, r#"{ "cache_size": 5 }"#).expect("write");
        assert!(matches!(
            WorldConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
