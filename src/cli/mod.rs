pub mod daemon_path;
pub mod latest;
pub mod process;

use std::{net::IpAddr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use latest::{process_latest_command, process_watch_command, LatestCommand, WatchCommand};
use process::{current_daemon_path, kill_previous_daemons, restart_daemon};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{args::CaptureArgs, capture_once, shutdown::detect_shutdown, start_daemon},
    server::{start_server, RelayConfig, DEFAULT_PORT},
    utils::{
        dir::{create_application_default_path, default_capture_dir},
        logging::{enable_logging, CLI_PREFIX, RELAY_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Screenrelay", version, long_about = None)]
#[command(about = "Takes screenshots at unpredictable intervals and relays them to a local service", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts the capture daemon, replacing a running one")]
    Init {
        #[command(flatten)]
        capture: CaptureArgs,
    },
    #[command(about = "Stop currently running capture daemons.")]
    Stop {},
    #[command(about = "Run the capture loop directly in current console")]
    Capture {
        #[arg(long, help = "Take a single capture and exit")]
        once: bool,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    #[command(about = "Run the relay service that stores captures and serves the latest one")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(
            long,
            help = "Capture directory. By default $XDG_DATA_HOME/screenrelay/captures or $HOME/.local/share/screenrelay/captures"
        )]
        dir: Option<PathBuf>,
    },
    #[command(about = "Show the latest capture known to the relay service")]
    Latest {
        #[command(flatten)]
        command: LatestCommand,
    },
    #[command(about = "Keep showing the latest capture as new ones arrive")]
    Watch {
        #[command(flatten)]
        command: WatchCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Serve { .. } => RELAY_PREFIX,
        _ => CLI_PREFIX,
    };
    let show_std = args.log
        || matches!(
            args.commands,
            Commands::Serve { .. } | Commands::Capture { .. }
        );
    enable_logging(
        prefix,
        &create_application_default_path()?,
        logging_level,
        show_std,
    )?;

    match args.commands {
        Commands::Init { capture } => {
            // Surface invalid options here rather than in a detached process.
            capture.clone().resolve()?;
            restart_daemon(&capture)
        }
        Commands::Stop {} => {
            let stopped = kill_previous_daemons(&current_daemon_path()?)?;
            println!("Stopped {stopped} capture daemon(s)");
            Ok(())
        }
        Commands::Capture { once: true, capture } => capture_once(capture.resolve()?).await,
        Commands::Capture { once: false, capture } => start_daemon(capture.resolve()?).await,
        Commands::Serve { host, port, dir } => {
            let config = RelayConfig {
                address: (host, port).into(),
                capture_dir: dir.map_or_else(default_capture_dir, Ok)?,
            };
            let shutdown = CancellationToken::new();
            let (_, server_result) = tokio::join!(
                detect_shutdown(shutdown.clone()),
                async {
                    let result = start_server(config, shutdown.clone()).await;
                    // Lets signal detection finish when the server couldn't start.
                    shutdown.cancel();
                    result
                }
            );
            server_result
        }
        Commands::Latest { command } => process_latest_command(command).await,
        Commands::Watch { command } => process_watch_command(command).await,
    }
}
