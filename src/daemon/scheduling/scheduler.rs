use std::time::Duration;

use anyhow::Result;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    capture::{Capture, ScreenCapturer},
    daemon::relaying::{CaptureRelay, RemoteAck},
    utils::clock::Clock,
};

use super::{config::SchedulerConfig, jitter::JitterSource};

/// Where the capture loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    WaitingRandom,
    Capturing,
    WaitingFixed,
    Stopped,
}

/// Takes screenshots at irregular intervals and hands them to a [CaptureRelay].
pub struct CaptureScheduler {
    capturer: Box<dyn ScreenCapturer>,
    relay: Box<dyn CaptureRelay>,
    clock: Box<dyn Clock>,
    jitter: Box<dyn JitterSource>,
    config: SchedulerConfig,
    shutdown: CancellationToken,
    state: watch::Sender<SchedulerState>,
}

impl CaptureScheduler {
    pub fn new(
        capturer: Box<dyn ScreenCapturer>,
        relay: Box<dyn CaptureRelay>,
        clock: Box<dyn Clock>,
        jitter: Box<dyn JitterSource>,
        config: SchedulerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            capturer,
            relay,
            clock,
            jitter,
            config,
            shutdown,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Spawns the capture loop. Consuming the scheduler means a loop can only be started once.
    pub fn start(self) -> SchedulerHandle {
        let shutdown = self.shutdown.clone();
        let state = self.subscribe();
        let task = tokio::spawn(self.run());
        SchedulerHandle {
            shutdown,
            state,
            task,
        }
    }

    /// Executes the capture loop until the shutdown token is cancelled.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Capture loop started, jitter up to {:?} then {:?} between captures",
            self.config.max_jitter, self.config.fixed_delay
        );
        let mut cycle = 0u64;
        loop {
            let delay = self.jitter.next_delay(self.config.max_jitter);
            debug!("Next capture in {delay:?}");
            if !self.wait(SchedulerState::WaitingRandom, delay).await {
                break;
            }

            cycle += 1;
            self.state.send_replace(SchedulerState::Capturing);
            self.capture_cycle()
                .instrument(info_span!("Capture cycle", cycle))
                .await;

            if !self.wait(SchedulerState::WaitingFixed, self.config.fixed_delay).await {
                break;
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!("Capture loop stopped after {cycle} cycles");
        Ok(())
    }

    /// Returns `false` when the wait was interrupted by shutdown.
    async fn wait(&self, state: SchedulerState, duration: Duration) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        self.state.send_replace(state);
        let deadline = self.clock.instant() + duration;
        tokio::select! {
            biased;
            // Cancelation drops the pending timer. A capture that is already running is never
            // interrupted, stop requests are only observed here.
            _ = self.shutdown.cancelled() => false,
            _ = self.clock.sleep_until(deadline) => true,
        }
    }

    /// Performs one capture and relays it. Every failure is logged and swallowed so the next
    /// cycle is always armed.
    async fn capture_cycle(&mut self) {
        let bytes = match self.capturer.capture().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Encountered an error during capture {e:?}");
                return;
            }
        };
        let capture = Capture::new(bytes, self.clock.time());
        let filename = capture.filename();
        debug!("Captured {} bytes as {filename}", capture.bytes().len());

        let report = self.relay.relay(capture).await;
        match &report.local {
            Ok(path) => debug!("Capture written to {path:?}"),
            Err(e) => error!("Failed to write {filename} locally {e:?}"),
        }
        match &report.remote {
            Ok(RemoteAck::Stored { .. }) => {}
            Ok(RemoteAck::MemoryOnly { error }) => {
                warn!("Relay couldn't persist {filename}: {error}")
            }
            Err(e) => error!("Failed to relay {filename} {e:?}"),
        }
        if report.is_complete() {
            info!("Successfully relayed {filename}");
        }
    }
}

/// Control over a running capture loop.
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    state: watch::Receiver<SchedulerState>,
    task: JoinHandle<Result<()>>,
}

impl SchedulerHandle {
    /// Cancels the pending wait and prevents further cycles. A capture in flight completes.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Waits for the loop to finish. Only returns after [SchedulerHandle::stop] or cancellation of
    /// the token the scheduler was created with.
    pub async fn join(self) -> Result<()> {
        self.task.await?
    }
}
