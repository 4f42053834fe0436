// src/code/process.rs

//! Pid files, liveness checks and signals for detached simulation processes.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info};

/// File holding the pid of the process launched in a simulation directory.
pub const PID_FILE: &str = ".simon.pid";

/// Pid recorded in `dir`, if the file exists and holds a positive number.
pub fn read_pid(dir: &Path) -> Option<i32> {
    let contents = fs::read_to_string(dir.join(PID_FILE)).ok()?;
    contents.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

pub fn write_pid(dir: &Path, pid: i32) -> Result<()> {
    let path = dir.join(PID_FILE);
    fs::write(&path, format!("{pid}\n")).with_context(|| format!("writing pid file {:?}", path))
}

/// Whether a process with this pid exists (signal 0 probe).
pub fn is_alive(pid: i32) -> bool {
    match signal::kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        // Exists, but belongs to somebody else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

pub fn send_signal(pid: i32, sig: Signal) -> Result<()> {
    debug!(pid, signal = %sig, "sending signal");
    signal::kill(Pid::from_raw(pid), sig)
        .with_context(|| format!("cannot send {sig} to pid {pid}"))
}

/// Launch `cmd` in the background inside `dir` and return its pid.
///
/// The process is started through an intermediate shell that exits right
/// away, so it is re-parented to init and never lingers as our zombie.
/// stdout/stderr are appended to the given files (relative to `dir`).
pub fn spawn_detached(dir: &Path, cmd: &str, stdout_file: &str, stderr_file: &str) -> Result<i32> {
    let script = format!(
        "nohup sh -c {} >> {} 2>> {} < /dev/null & echo $!",
        shell_quote(cmd),
        shell_quote(stdout_file),
        shell_quote(stderr_file),
    );

    let output = Command::new("sh")
        .arg("-c")
        .arg(&script)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawning launcher shell in {:?}", dir))?;

    if !output.status.success() {
        bail!(
            "launcher shell exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let pid = stdout
        .trim()
        .parse::<i32>()
        .with_context(|| format!("launcher did not report a pid (got {:?})", stdout.trim()))?;

    info!(pid, dir = ?dir, cmd, "simulation process launched");
    Ok(pid)
}

/// Run `cmd` through `sh -c` in `dir`, wait for it, and return its combined
/// stdout and stderr.
pub fn run_in_dir(dir: &Path, cmd: &str) -> Result<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("running '{cmd}' in {:?}", dir))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        bail!("'{cmd}' exited with {}: {}", output.status, text.trim());
    }
    Ok(text)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        assert!(is_alive(std::process::id() as i32));
    }

    #[test]
    fn pid_file_roundtrip_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_pid(dir.path()), None);

        write_pid(dir.path(), 4242).unwrap();
        assert_eq!(read_pid(dir.path()), Some(4242));

        fs::write(dir.path().join(PID_FILE), "not a pid").unwrap();
        assert_eq!(read_pid(dir.path()), None);

        fs::write(dir.path().join(PID_FILE), "0").unwrap();
        assert_eq!(read_pid(dir.path()), None);
    }

    #[test]
    fn quoting_survives_single_quotes() {
        assert_eq!(shell_quote("echo 'hi'"), r"'echo '\''hi'\'''");
    }

    #[test]
    fn run_in_dir_captures_output_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_in_dir(dir.path(), "echo hello; echo oops 1>&2").unwrap();
        assert!(out.contains("hello"));
        assert!(out.contains("oops"));

        assert!(run_in_dir(dir.path(), "exit 3").is_err());
    }
}
