use anyhow::Result;
use args::CaptureSettings;
use relaying::{client::RelayClient, CaptureRelay};
use scheduling::{
    config::SchedulerConfig,
    jitter::{JitterSource, RandomJitter},
    scheduler::CaptureScheduler,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    capture::{command::CommandCapturer, Capture, ScreenCapturer},
    storage::capture_store::CaptureStore,
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod relaying;
pub mod scheduling;
pub mod shutdown;

/// Represents the starting point for the capture daemon. Runs until the process is interrupted.
pub async fn start_daemon(settings: CaptureSettings) -> Result<()> {
    let capturer = create_capturer(&settings)?;
    let relay = create_relay(&settings)?;

    let shutdown_token = CancellationToken::new();

    let scheduler = create_scheduler(
        capturer,
        relay,
        DefaultClock,
        RandomJitter,
        settings.scheduler,
        &shutdown_token,
    );

    info!(
        "Capturing into {:?}, relaying to {}",
        settings.capture_dir, settings.relay_url
    );

    let (_, scheduler_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        scheduler.run(),
    );

    if let Err(scheduler_result) = scheduler_result {
        error!("Capture scheduler got an error {:?}", scheduler_result);
    }

    Ok(())
}

/// Takes a single capture and relays it right away, outside of any schedule.
pub async fn capture_once(settings: CaptureSettings) -> Result<()> {
    let capturer = create_capturer(&settings)?;
    let relay = create_relay(&settings)?;

    let bytes = capturer.capture().await?;
    let capture = Capture::new(bytes, DefaultClock.time());
    let report = relay.relay(capture).await;

    match (report.local, report.remote) {
        (Ok(path), Ok(ack)) => {
            info!("Capture written to {path:?}, relay answered {ack:?}");
            Ok(())
        }
        (local, remote) => {
            if let Err(e) = &local {
                error!("Local write failed {e:?}");
            }
            if let Err(e) = &remote {
                error!("Relay failed {e:?}");
            }
            // One successful destination is enough for a capture to count.
            local.map(|_| ()).or(remote.map(|_| ())).map_err(Into::into)
        }
    }
}

fn create_capturer(settings: &CaptureSettings) -> Result<CommandCapturer> {
    match &settings.capture_command {
        Some(command) => CommandCapturer::from_command_line(command),
        None => CommandCapturer::platform_default(),
    }
}

fn create_relay(settings: &CaptureSettings) -> Result<RelayClient> {
    RelayClient::new(
        CaptureStore::new(settings.capture_dir.clone()),
        &settings.relay_url,
        settings.timeout,
    )
}

fn create_scheduler(
    capturer: impl ScreenCapturer + 'static,
    relay: impl CaptureRelay + 'static,
    clock: impl Clock,
    jitter: impl JitterSource + 'static,
    config: SchedulerConfig,
    shutdown_token: &CancellationToken,
) -> CaptureScheduler {
    CaptureScheduler::new(
        Box::new(capturer),
        Box::new(relay),
        Box::new(clock),
        Box::new(jitter),
        config,
        shutdown_token.clone(),
    )
}
