//! Operational helpers: logging setup and local data directories.

use std::path::{Path, PathBuf};

use courtside_types::{config::OpsConfig, CourtsideError, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| CourtsideError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CourtsideError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Like [`init_tracing`] but writes to `courtside.log` inside the data dir,
/// for frontends that own the terminal.
pub fn init_file_tracing(config: &OpsConfig) -> Result<PathBuf> {
    let dir = ensure_data_dir(&config.data_dir)?;
    let path = dir.join("courtside.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| CourtsideError::Ops(format!("failed to open log file: {err}")))?;
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| CourtsideError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .try_init()
        .map_err(|err| CourtsideError::Ops(format!("tracing init error: {err}")))?;
    Ok(path)
}

pub fn ensure_data_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| CourtsideError::Ops(format!("failed to create data dir: {err}")))?;
    info!("Data directory ready at {:?}", dir);
    Ok(dir)
}

/// Resolves a store file relative to the data dir unless it is already absolute.
pub fn data_file(config: &OpsConfig, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(&config.data_dir).join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(dir: &str) -> OpsConfig {
        OpsConfig {
            log_level: "debug".into(),
            data_dir: dir.into(),
        }
    }

    #[test]
    fn data_dir_is_created() {
        let dir = std::env::temp_dir().join(format!("courtside-ops-{}", std::process::id()));
        let created = ensure_data_dir(dir.to_str().expect("utf8 path")).expect("create dir");
        assert!(created.is_dir());
        std::fs::remove_dir_all(&created).expect("cleanup");
    }

    #[test]
    fn data_file_respects_absolute_paths() {
        let config = ops("data");
        assert_eq!(data_file(&config, "season.json"), PathBuf::from("data/season.json"));
        let absolute = std::env::temp_dir().join("season.json");
        assert_eq!(
            data_file(&config, absolute.to_str().expect("utf8 path")),
            absolute
        );
    }
}
