use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Replace the current process with a fresh copy of itself, started with the
/// same arguments, so configuration is resolved from scratch.
pub fn restart_process() -> Result<()> {
    let current_exe =
        std::env::current_exe().context("cannot determine current executable path")?;
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    relaunch(&current_exe, &args)
}

#[cfg(unix)]
fn relaunch(exe: &Path, args: &[OsString]) -> Result<()> {
    use std::os::unix::process::CommandExt;

    // exec only returns on failure
    let err = Command::new(exe).args(args).exec();
    Err(err).with_context(|| format!("failed to restart {}", exe.display()))
}

#[cfg(not(unix))]
fn relaunch(exe: &Path, args: &[OsString]) -> Result<()> {
    let status = Command::new(exe)
        .args(args)
        .status()
        .with_context(|| format!("failed to restart {}", exe.display()))?;
    std::process::exit(status.code().unwrap_or(1));
}
