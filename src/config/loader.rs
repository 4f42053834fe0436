// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile, SimulationConfig, SimulationFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// A relative `root_dir` is resolved against the directory that contains the
/// config file, so `simon --config ~/runs/SiMon.toml` works from anywhere.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw_config = load_from_path(path)?;

    if let Some(root) = raw_config.simon.root_dir.take() {
        raw_config.simon.root_dir = Some(resolve_against(config_dir(path), root));
    }

    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse the contents of a per-simulation `simulation.toml`.
pub fn parse_simulation_config(contents: &str) -> Result<SimulationConfig> {
    let file: SimulationFile = toml::from_str(contents)?;
    Ok(file.simulation)
}

fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve_against(base: PathBuf, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
