use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Args, Parser};
use tracing::level_filters::LevelFilter;

use crate::utils::dir::default_capture_dir;

use super::{
    relaying::client::DEFAULT_RELAY_URL,
    scheduling::config::{SchedulerConfig, DEFAULT_INTERVAL_MINUTES},
};

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    #[arg(
        long,
        help = "Capture directory. By default $XDG_DATA_HOME/screenrelay/captures or $HOME/.local/share/screenrelay/captures"
    )]
    pub dir: Option<PathBuf>,
    #[arg(long = "relay-url", default_value = DEFAULT_RELAY_URL, help = "Base url of the relay service")]
    pub relay_url: String,
    #[arg(
        long,
        default_value_t = DEFAULT_INTERVAL_MINUTES,
        help = "Screenshot interval in minutes (1-60). Captures happen every interval plus a random delay of up to one interval"
    )]
    pub interval: u64,
    #[arg(long, default_value_t = 5, help = "Relay request timeout in seconds")]
    pub timeout: u64,
    #[arg(
        long = "capture-command",
        help = "Command that prints a PNG screenshot to stdout, for example \"grim -\""
    )]
    pub capture_command: Option<String>,
}

/// [CaptureArgs] with defaults resolved and values validated.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub capture_dir: PathBuf,
    pub relay_url: String,
    pub scheduler: SchedulerConfig,
    pub timeout: Duration,
    pub capture_command: Option<String>,
}

impl CaptureArgs {
    pub fn resolve(self) -> Result<CaptureSettings> {
        let capture_dir = self.dir.map_or_else(default_capture_dir, Ok)?;
        Ok(CaptureSettings {
            capture_dir,
            relay_url: self.relay_url,
            scheduler: SchedulerConfig::from_interval_minutes(self.interval)?,
            timeout: Duration::from_secs(self.timeout.max(1)),
            capture_command: self.capture_command,
        })
    }

    /// Command line that reproduces these arguments, used when spawning the daemon.
    pub fn to_command_args(&self) -> Vec<String> {
        let mut args = vec![
            "--relay-url".to_string(),
            self.relay_url.clone(),
            "--interval".to_string(),
            self.interval.to_string(),
            "--timeout".to_string(),
            self.timeout.to_string(),
        ];
        if let Some(dir) = &self.dir {
            args.push("--dir".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        if let Some(command) = &self.capture_command {
            args.push("--capture-command".into());
            args.push(command.clone());
        }
        args
    }
}

#[derive(Parser, Debug)]
pub struct DaemonArgs {
    #[arg(long)]
    pub force: bool,
    /// Application directory used for logs.
    #[arg(long = "app-dir")]
    pub app_dir: Option<PathBuf>,
    #[command(flatten)]
    pub capture: CaptureArgs,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

impl DaemonArgs {
    /// Anchors relative directories to the current working directory. Daemonizing changes the
    /// working directory to `/`, so this has to happen before detaching.
    pub fn with_absolute_paths(mut self) -> Result<Self> {
        if let Some(dir) = self.capture.dir.take() {
            self.capture.dir = Some(std::path::absolute(dir)?);
        }
        if let Some(dir) = self.app_dir.take() {
            self.app_dir = Some(std::path::absolute(dir)?);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use clap::Parser;

    use super::DaemonArgs;

    #[test]
    fn test_capture_args_survive_respawn() {
        let args = DaemonArgs::parse_from([
            "screenrelay-daemon",
            "--dir",
            "/tmp/captures",
            "--interval",
            "15",
            "--capture-command",
            "grim -",
        ]);

        let respawned = DaemonArgs::parse_from(
            std::iter::once("screenrelay-daemon".to_string())
                .chain(args.capture.to_command_args()),
        );

        assert_eq!(respawned.capture.dir, Some(PathBuf::from("/tmp/captures")));
        assert_eq!(respawned.capture.interval, 15);
        assert_eq!(respawned.capture.capture_command.as_deref(), Some("grim -"));
        assert_eq!(respawned.capture.relay_url, "http://localhost:3030");
    }

    #[test]
    fn test_resolve_validates_interval() {
        let args = DaemonArgs::parse_from(["screenrelay-daemon", "--dir", "/tmp", "--interval", "90"]);
        assert!(args.capture.resolve().is_err());

        let args = DaemonArgs::parse_from(["screenrelay-daemon", "--dir", "/tmp", "--timeout", "0"]);
        let settings = args.capture.resolve().unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert_eq!(settings.scheduler.fixed_delay, Duration::from_secs(600));
    }

    #[test]
    fn test_relative_dirs_become_absolute() -> anyhow::Result<()> {
        let args = DaemonArgs::parse_from([
            "screenrelay-daemon",
            "--dir",
            "captures",
            "--app-dir",
            "state",
        ])
        .with_absolute_paths()?;

        let cwd = std::env::current_dir()?;
        assert_eq!(args.capture.dir, Some(cwd.join("captures")));
        assert_eq!(args.app_dir, Some(cwd.join("state")));

        let args = DaemonArgs::parse_from(["screenrelay-daemon", "--dir", "/tmp/captures"])
            .with_absolute_paths()?;
        assert_eq!(args.capture.dir, Some(PathBuf::from("/tmp/captures")));
        assert_eq!(args.app_dir, None);
        Ok(())
    }
}
