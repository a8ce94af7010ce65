use std::process::Stdio;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CaptureError;

use super::ScreenCapturer;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Captures the screen by running an external screenshot tool that writes a PNG to stdout.
#[derive(Debug, Clone)]
pub struct CommandCapturer {
    program: String,
    args: Vec<String>,
}

impl CommandCapturer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a command line such as `grim -`. Arguments are split on whitespace, quoting is not
    /// supported.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("Capture command can't be empty"))?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Screenshot tool that ships with (or is commonly installed on) the current platform.
    pub fn platform_default() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "macos")] {
                Self::from_command_line("screencapture -x -t png /dev/stdout")
            } else if #[cfg(all(unix, not(target_os = "macos")))] {
                if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                    Self::from_command_line("grim -")
                } else {
                    Self::from_command_line("import -window root png:-")
                }
            } else {
                Err(anyhow!("No default capture command for this platform, pass --capture-command"))
            }
        }
    }
}

#[async_trait]
impl ScreenCapturer for CommandCapturer {
    async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        debug!("Running {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::Capture(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(CaptureError::Capture(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(CaptureError::Capture(format!(
                "{} produced no image data",
                self.program
            )));
        }

        if !output.stdout.starts_with(PNG_SIGNATURE) {
            warn!("{} output doesn't look like a PNG", self.program);
        }

        Ok(output.stdout)
    }
}
