// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::env::args;

use anyhow::Result;
use clap::Parser;
use screenrelay::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};

/// Where execution continues after trying to detach from the terminal.
enum Detached {
    /// This process started the daemon and should exit.
    Launcher,
    /// This process is the daemon.
    Daemon,
}

fn main() -> Result<()> {
    let command_args = args().collect::<Vec<_>>();
    let args = DaemonArgs::parse_from(&command_args).with_absolute_paths()?;

    if !args.force {
        if let Detached::Launcher = detach(command_args)? {
            println!("Created daemon");
            return Ok(());
        }
    }

    run(args)
}

#[cfg(unix)]
fn detach(_command_args: Vec<String>) -> Result<Detached> {
    use daemonize::{Daemonize, Outcome, Stdio};

    let outcome = Daemonize::new()
        .stdout(Stdio::devnull())
        .stderr(Stdio::devnull())
        .execute();
    match outcome {
        Outcome::Parent(parent) => {
            parent?;
            Ok(Detached::Launcher)
        }
        Outcome::Child(child) => {
            child?;
            Ok(Detached::Daemon)
        }
    }
}

/// Windows has no fork, the daemon is relaunched as a detached process with `--force`.
#[cfg(windows)]
fn detach(mut command_args: Vec<String>) -> Result<Detached> {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x00000008;

    command_args.push("--force".into());
    let mut command = std::process::Command::new(std::env::current_exe()?);
    command
        .args(command_args.into_iter().skip(1))
        .creation_flags(DETACHED_PROCESS)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    #[allow(clippy::zombie_processes)]
    command.spawn()?;
    Ok(Detached::Launcher)
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = args
        .app_dir
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;
    let settings = args.capture.resolve()?;
    single_thread_runtime()?.block_on(start_daemon(settings))
}
