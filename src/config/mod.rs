// src/config/mod.rs

//! Configuration loading and validation for SiMon.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`): the monitor's own
//!   `SiMon.toml` and the per-simulation `simulation.toml` marker.
//! - Load config files from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_simulation_config};
pub use model::{
    ConfigFile, RawConfigFile, SimonSection, SimulationConfig, SIMULATION_CONFIG_FILE,
};
pub use validate::validate_config;
