// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SimonError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SimonError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let section = raw.simon;
        let root_dir = section
            .root_dir
            .ok_or_else(|| SimonError::ConfigError("[simon].root_dir is missing".to_string()))?;

        Ok(ConfigFile {
            root_dir,
            max_concurrent_jobs: section.max_concurrent_jobs,
            interval: std::time::Duration::from_secs_f64(section.daemon_sleep_time),
            scan_pattern: section.scan_pattern,
        })
    }
}

/// Semantic checks on a deserialized config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_root_dir(cfg)?;
    validate_limits(cfg)?;
    validate_scan_pattern(cfg)?;
    Ok(())
}

fn ensure_has_root_dir(cfg: &RawConfigFile) -> Result<()> {
    match cfg.simon.root_dir {
        Some(ref dir) if !dir.as_os_str().is_empty() => Ok(()),
        _ => Err(SimonError::ConfigError(
            "[simon].root_dir is missing; SiMon cannot start without a simulation root".to_string(),
        )),
    }
}

fn validate_limits(cfg: &RawConfigFile) -> Result<()> {
    if cfg.simon.max_concurrent_jobs == 0 {
        return Err(SimonError::ConfigError(
            "[simon].max_concurrent_jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    let sleep = cfg.simon.daemon_sleep_time;
    if !sleep.is_finite() || sleep <= 0.0 {
        return Err(SimonError::ConfigError(format!(
            "[simon].daemon_sleep_time must be a positive number of seconds (got {sleep})"
        )));
    }

    Ok(())
}

fn validate_scan_pattern(cfg: &RawConfigFile) -> Result<()> {
    Glob::new(&cfg.simon.scan_pattern).map_err(|e| {
        SimonError::ConfigError(format!(
            "[simon].scan_pattern '{}' is not a valid glob: {e}",
            cfg.simon.scan_pattern
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn raw(root: Option<&str>) -> RawConfigFile {
        let mut cfg = RawConfigFile::default();
        cfg.simon.root_dir = root.map(PathBuf::from);
        cfg
    }

    #[test]
    fn missing_root_dir_is_rejected() {
        let err = ConfigFile::try_from(raw(None)).unwrap_err();
        assert!(matches!(err, SimonError::ConfigError(msg) if msg.contains("root_dir")));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut cfg = raw(Some("sims"));
        cfg.simon.max_concurrent_jobs = 0;
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn bad_glob_is_rejected() {
        let mut cfg = raw(Some("sims"));
        cfg.simon.scan_pattern = "run_[".to_string();
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = ConfigFile::try_from(raw(Some("sims"))).unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 2);
        assert_eq!(cfg.interval.as_secs(), 180);
        assert_eq!(cfg.scan_pattern, "*");
    }
}
