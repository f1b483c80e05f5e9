use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod config;
pub mod environment;
pub mod geometry;
pub mod map;
mod sync;

pub use config::{AuthoringPolicy, ConfigError, WorldConfig};
pub use environment::{
    AnimationBackend, AnimationController, AnimationHandle, AuthoringError, CollisionSettings,
    CombatAttributes, EntityId, EntityKind, Environment, EnvironmentError, EnvironmentServices,
    EnvironmentState, IdSequenceError, IdSequences, InitSummary, LightSource, MapObjectKind,
    Material, NullAnimations, NullPhysics, PhysicsSink, PropState, PropertyError, PropertyReader,
    Rgba, WorldEntity,
};
pub use geometry::{Path as WorldPath, Polygon, Rect, Shape, Size, Vec2};
pub use map::{
    GridId, Map, MapErrorCode, MapIdentity, MapLoadError, MapLoader, MapObject, TileCache,
    TileCacheStats, Tileset, TmxMapLoader,
};

pub const ROOT_ENV_VAR: &str = "WORLD_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub maps_dir: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "WORLD_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/world\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_at(root))
}

fn app_paths_at(root: PathBuf) -> AppPaths {
    let maps_dir = root.join("assets").join("maps");
    let config_path = root.join("config").join("world.json");
    AppPaths {
        root,
        maps_dir,
        config_path,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let temp = TempDir::new().expect("temp");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        fs::create_dir_all(temp.path().join("assets").join("maps")).expect("mkdir");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("mkdir");

        let root = find_root_above(&nested).expect("root");
        assert_eq!(root, normalize_path(temp.path()));

        let paths = app_paths_at(root.clone());
        assert_eq!(paths.maps_dir, root.join("assets").join("maps"));
        assert_eq!(paths.config_path, root.join("config").join("world.json"));
    }
}
