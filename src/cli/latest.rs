use std::time::Duration;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use tracing::warn;

use crate::{
    daemon::relaying::client::{RelayClient, DEFAULT_RELAY_URL, DEFAULT_REQUEST_TIMEOUT},
    server::protocol::LatestResponse,
    storage::capture_store::CaptureStore,
    utils::time::relative_age,
};

/// How often the web shell refreshes its screenshot preview.
pub const DEFAULT_WATCH_SECONDS: u64 = 10;

#[derive(Args, Debug)]
pub struct LatestCommand {
    #[arg(long = "relay-url", default_value = DEFAULT_RELAY_URL)]
    pub relay_url: String,
}

#[derive(Args, Debug)]
pub struct WatchCommand {
    #[command(flatten)]
    pub latest: LatestCommand,
    #[arg(long, default_value_t = DEFAULT_WATCH_SECONDS, help = "Polling period in seconds")]
    pub every: u64,
}

fn create_client(relay_url: &str) -> Result<RelayClient> {
    // The store is never written to by read only commands.
    RelayClient::new(
        CaptureStore::new(std::env::temp_dir()),
        relay_url,
        DEFAULT_REQUEST_TIMEOUT,
    )
}

pub async fn process_latest_command(command: LatestCommand) -> Result<()> {
    let client = create_client(&command.relay_url)?;
    let latest = client.latest().await?;
    println!("{}", describe(latest.as_ref(), Utc::now()));
    Ok(())
}

/// Polls the relay service and prints every new capture. Failed polls are reported and retried on
/// the next tick.
pub async fn process_watch_command(command: WatchCommand) -> Result<()> {
    let client = create_client(&command.latest.relay_url)?;
    let mut interval = tokio::time::interval(Duration::from_secs(command.every.max(1)));
    let mut last_seen: Option<Option<String>> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = interval.tick() => (),
        }
        match client.latest().await {
            Ok(latest) => {
                let key = latest.as_ref().map(|v| v.timestamp.clone());
                if last_seen.as_ref() != Some(&key) {
                    println!("{}", describe(latest.as_ref(), Utc::now()));
                    last_seen = Some(key);
                }
            }
            Err(e) => {
                warn!("Failed to poll relay {e:?}");
                println!("{}", Colour::Red.paint(format!("Relay unavailable: {e}")));
            }
        }
    }
}

fn describe(latest: Option<&LatestResponse>, now: DateTime<Utc>) -> String {
    let Some(latest) = latest else {
        return Colour::Yellow.paint("No captures yet").to_string();
    };

    let age = DateTime::parse_from_rfc3339(&latest.timestamp)
        .map(|v| relative_age(now, v.with_timezone(&Utc)))
        .unwrap_or_else(|_| "at an unknown time".into());

    let location = match (&latest.filename, &latest.file_path) {
        (Some(filename), Some(path)) => format!("{filename} ({})", path.display()),
        (Some(filename), None) => filename.clone(),
        _ => Colour::Red.paint("in memory only").to_string(),
    };

    format!(
        "{} {} {}",
        Style::new().bold().paint("Latest capture"),
        Colour::Cyan.paint(age),
        location
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};

    use crate::server::protocol::LatestResponse;

    use super::describe;

    fn response(filename: Option<&str>) -> LatestResponse {
        LatestResponse {
            success: true,
            data: "data:image/png;base64,aGVsbG8=".into(),
            timestamp: "2018-07-04T10:00:00.000Z".into(),
            filename: filename.map(String::from),
            file_path: filename.map(|v| PathBuf::from("/captures").join(v)),
        }
    }

    #[test]
    fn test_describe() {
        let now = Utc.timestamp_millis_opt(1_530_698_400_000 + 5 * 60 * 1000).unwrap();

        let text = describe(Some(&response(Some("screenshot_1530698400000.png"))), now);
        assert!(text.contains("5 minutes ago"), "{text}");
        assert!(text.contains("screenshot_1530698400000.png"), "{text}");

        let text = describe(Some(&response(None)), now);
        assert!(text.contains("in memory only"), "{text}");

        assert!(describe(None, now).contains("No captures yet"));
    }
}
