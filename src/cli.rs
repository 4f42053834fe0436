// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::engine::Action;

/// Command-line arguments for `simon`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "simon",
    version,
    about = "Monitor, start and restart numerical simulations in a directory tree.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the monitor config file (TOML).
    ///
    /// Default: `SiMon.toml` in the current working directory. May be
    /// missing if `--root-dir` is given.
    #[arg(long, value_name = "PATH", default_value = "SiMon.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SIMON_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Root directory holding the simulations; overrides the config file.
    #[arg(long, value_name = "DIR")]
    pub root_dir: Option<PathBuf>,

    /// Maximum number of simulations running at once.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_jobs: Option<u32>,

    /// Seconds between scheduling passes in daemon mode.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the periodic scheduler until Ctrl-C.
    Daemon,
    /// Run exactly one scheduling pass and print what was dispatched.
    Once,
    /// Print the simulation tree with statuses.
    List,
    /// Apply one action to the selected simulations.
    Action {
        #[arg(value_enum)]
        action: ActionArg,
        /// Ids to act on, e.g. `1,3,5-7`.
        ids: String,
        /// Shell command for `exec`.
        #[arg(long, value_name = "CMD", required_if_eq("action", "exec"))]
        cmd: Option<String>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Start,
    Restart,
    Check,
    Stop,
    Delete,
    Kill,
    Backup,
    Exec,
}

impl ActionArg {
    /// `cmd` is only consulted for `exec`.
    pub fn into_action(self, cmd: Option<String>) -> Action {
        match self {
            ActionArg::Start => Action::Start,
            ActionArg::Restart => Action::Restart,
            ActionArg::Check => Action::Check,
            ActionArg::Stop => Action::Stop,
            ActionArg::Delete => Action::Delete,
            ActionArg::Kill => Action::Kill,
            ActionArg::Backup => Action::Backup,
            ActionArg::Exec => Action::Exec(cmd.unwrap_or_default()),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_subcommand_parses_ids_and_cmd() {
        let args = CliArgs::try_parse_from([
            "simon", "--root-dir", "sims", "action", "exec", "1,3-4", "--cmd", "ls -l",
        ])
        .unwrap();
        assert_eq!(args.root_dir, Some(PathBuf::from("sims")));
        match args.command {
            Command::Action { action, ids, cmd } => {
                assert_eq!(ids, "1,3-4");
                assert_eq!(action.into_action(cmd), Action::Exec("ls -l".into()));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn exec_without_cmd_is_rejected() {
        assert!(CliArgs::try_parse_from(["simon", "action", "exec", "1"]).is_err());
    }

    #[test]
    fn zero_max_jobs_is_rejected() {
        assert!(CliArgs::try_parse_from(["simon", "--max-jobs", "0", "once"]).is_err());
    }
}
