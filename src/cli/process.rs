use std::{env, path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use crate::daemon::args::CaptureArgs;

use super::daemon_path::to_daemon_path;

/// Terminates every process running the executable at `name`, except this one. Returns how many
/// were stopped.
pub fn kill_previous_daemons(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid: {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping capture daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

pub fn current_daemon_path() -> Result<std::path::PathBuf> {
    Ok(to_daemon_path(env::current_exe()?))
}

/// Shuts down previous capture daemons and starts a new one with `capture` options. The daemon
/// runs as a detached process.
pub fn restart_daemon(capture: &CaptureArgs) -> Result<()> {
    let daemon = current_daemon_path()?;
    kill_previous_daemons(&daemon)?;
    let mut command = std::process::Command::new(&daemon);
    command.arg("--force");
    command.args(capture.to_command_args());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        // DETACHED_PROCESS
        command.creation_flags(0x00000008);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    println!("Spawning {daemon:?}");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    println!("Success");
    Ok(())
}
