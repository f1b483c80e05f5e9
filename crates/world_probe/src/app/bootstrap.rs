use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use world::{resolve_app_paths, ConfigError, EnvironmentError, Rect, StartupError, WorldConfig};

const USAGE: &str = "usage: world_probe [MAP.tmx] [--query x,y,width,height]\n\
Loads a map, builds its environment and prints a JSON summary.\n\
Without MAP the first .tmx under assets/maps is used.";

#[derive(Debug, Error)]
pub(crate) enum ProbeError {
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to list maps directory {path}: {source}")]
    ReadMapsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no .tmx map found in {0}")]
    NoMapFound(PathBuf),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ProbeOptions {
    pub(crate) map_path: Option<PathBuf>,
    pub(crate) query: Option<Rect>,
    pub(crate) show_help: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ProbeWiring {
    pub(crate) map_path: PathBuf,
    pub(crate) config: WorldConfig,
    pub(crate) query: Option<Rect>,
}

/// `Ok(None)` when only help was requested.
pub(crate) fn build_probe(
    args: impl IntoIterator<Item = String>,
) -> Result<Option<ProbeWiring>, ProbeError> {
    init_tracing();
    let options = parse_args(args.into_iter().collect()).map_err(ProbeError::Usage)?;
    if options.show_help {
        println!("{USAGE}");
        return Ok(None);
    }

    let (map_path, config) = match options.map_path {
        Some(map_path) => {
            let config = match resolve_app_paths() {
                Ok(paths) => WorldConfig::load(&paths.config_path)?,
                Err(error) => {
                    warn!(error = %error, "project_root_unresolved_using_default_config");
                    WorldConfig::default()
                }
            };
            (map_path, config)
        }
        None => {
            let paths = resolve_app_paths()?;
            let config = WorldConfig::load(&paths.config_path)?;
            (first_map_in(&paths.maps_dir)?, config)
        }
    };

    info!(
        map_path = %map_path.display(),
        authoring_policy = ?config.authoring_policy,
        evict_tile_cache_on_unload = config.evict_tile_cache_on_unload,
        query = ?options.query,
        "probe_configured"
    );
    Ok(Some(ProbeWiring {
        map_path,
        config,
        query: options.query,
    }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn parse_args(args: Vec<String>) -> Result<ProbeOptions, String> {
    let mut options = ProbeOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                options.show_help = true;
                index += 1;
            }
            "--query" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --query".to_string())?;
                options.query = Some(parse_rect(value).ok_or_else(|| {
                    format!("invalid --query value '{value}' (expected x,y,width,height)")
                })?);
                index += 2;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
            path => {
                if options.map_path.is_some() {
                    return Err(format!("unexpected extra argument '{path}'"));
                }
                options.map_path = Some(PathBuf::from(path));
                index += 1;
            }
        }
    }
    Ok(options)
}

fn parse_rect(raw: &str) -> Option<Rect> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok().filter(|value| value.is_finite()))
        .collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        [x, y, width, height] if *width >= 0.0 && *height >= 0.0 => {
            Some(Rect::new(*x, *y, *width, *height))
        }
        _ => None,
    }
}

fn first_map_in(maps_dir: &Path) -> Result<PathBuf, ProbeError> {
    let entries = fs::read_dir(maps_dir).map_err(|source| ProbeError::ReadMapsDir {
        path: maps_dir.to_path_buf(),
        source,
    })?;
    let mut maps = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|extension| extension.eq_ignore_ascii_case("tmx"))
        })
        .collect::<Vec<_>>();
    maps.sort();
    maps.into_iter()
        .next()
        .ok_or_else(|| ProbeError::NoMapFound(maps_dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_map_and_query() {
        let options = parse_args(args(&["level.tmx", "--query", "0, 16,32,48"])).expect("args");
        assert_eq!(options.map_path, Some(PathBuf::from("level.tmx")));
        assert_eq!(options.query, Some(Rect::new(0.0, 16.0, 32.0, 48.0)));
        assert!(!options.show_help);
    }

    #[test]
    fn rejects_malformed_query() {
        assert!(parse_args(args(&["--query"])).is_err());
        assert!(parse_args(args(&["--query", "1,2,3"])).is_err());
        assert!(parse_args(args(&["--query", "1,2,-3,4"])).is_err());
        assert!(parse_args(args(&["--query", "a,b,c,d"])).is_err());
    }

    #[test]
    fn rejects_unknown_flags_and_extra_maps() {
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["a.tmx", "b.tmx"])).is_err());
        assert!(parse_args(args(&["--help"])).expect("help").show_help);
    }

    #[test]
    fn first_map_is_sorted_and_tmx_only() {
        let temp = TempDir::new().expect("temp");
        fs::write(temp.path().join("notes.txt"), "").expect("write");
        fs::write(temp.path().join("b.tmx"), "").expect("write");
        fs::write(temp.path().join("a.TMX"), "").expect("write");
        assert_eq!(
            first_map_in(temp.path()).expect("map"),
            temp.path().join("a.TMX")
        );
    }

    #[test]
    fn empty_maps_dir_is_an_error() {
        let temp = TempDir::new().expect("temp");
        assert!(matches!(
            first_map_in(temp.path()),
            Err(ProbeError::NoMapFound(_))
        ));
    }
}
