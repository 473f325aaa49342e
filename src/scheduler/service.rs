use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cadence::CadenceState;
use crate::clock::{ClockReader, MonotonicClock, SharedClockModel, SystemClock};
use crate::discovery::{PeerLocator, Resolver, SystemResolver};
use crate::error::SyncError;
use crate::probe::{ProbeEngine, ProbeSample, ProbeTransport, UdpTransport};
use crate::types::{PeerSource, SyncConfig};

const COMMAND_QUEUE: usize = 8;

/// Deadline used when an interval does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Start of the cycle after one that started at `started`
pub(crate) fn next_deadline(started: Instant, interval: Duration) -> Instant {
    started
        .checked_add(interval)
        .or_else(|| started.checked_add(FAR_FUTURE))
        .unwrap_or(started)
}

/// Progress of the cadence loop, published after every change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    /// Current schedule
    pub cadence: CadenceState,
    /// Peer address in use, if a valid one is cached
    pub peer: Option<SocketAddr>,
    /// Failed bursts since the last success against the cached peer
    pub consecutive_failures: u32,
    /// Failed bursts since start
    pub failed_bursts: u64,
}

enum Command {
    Trigger(oneshot::Sender<Result<ProbeSample, SyncError>>),
    SetPeer(PeerSource, oneshot::Sender<()>),
}

/// Background loop keeping the clock model locked to the reference peer.
///
/// Owns the locator, the probe engine, the schedule and the only write
/// handle to the model.
pub struct ClockSyncService {
    locator: PeerLocator,
    engine: ProbeEngine,
    model: SharedClockModel,
    cadence: CadenceState,
    status: watch::Sender<SyncStatus>,
    failed_bursts: u64,
}

impl ClockSyncService {
    /// Start the engine on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `config` does not validate or no tokio
    /// runtime is running.
    pub fn spawn(
        config: &SyncConfig,
        resolver: Arc<dyn Resolver>,
        transport: Arc<dyn ProbeTransport>,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<ClockSyncHandle, SyncError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SyncError::InvalidParameter {
                name: "runtime".to_string(),
                message: e.to_string(),
            }
        })?;

        let model = SharedClockModel::new(Arc::clone(&clock));
        let reader = model.reader();
        let cadence = CadenceState::new(config);
        let (status_tx, status_rx) = watch::channel(SyncStatus {
            cadence,
            peer: None,
            consecutive_failures: 0,
            failed_bursts: 0,
        });
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let service = Self {
            locator: PeerLocator::new(resolver, config),
            engine: ProbeEngine::new(transport, clock, config),
            model,
            cadence,
            status: status_tx,
            failed_bursts: 0,
        };

        tracing::info!(peer = %config.peer, "Starting clock sync service");
        let task = runtime.spawn(service.run(command_rx, shutdown_rx));

        Ok(ClockSyncHandle {
            reader,
            commands: command_tx,
            status: status_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        })
    }

    /// Start with the system resolver, UDP transport and monotonic clock
    ///
    /// # Errors
    ///
    /// See [`ClockSyncService::spawn`].
    pub fn start(config: &SyncConfig) -> Result<ClockSyncHandle, SyncError> {
        Self::spawn(
            config,
            Arc::new(SystemResolver::new()),
            Arc::new(UdpTransport::new()),
            Arc::new(SystemClock::new()),
        )
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut next_cycle = Instant::now();

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                command = commands.recv() => match command {
                    Some(Command::Trigger(reply)) => {
                        let _ = reply.send(self.trigger().await);
                    }
                    Some(Command::SetPeer(peer, ack)) => {
                        self.locator.set_source(peer);
                        self.publish();
                        next_cycle = Instant::now();
                        let _ = ack.send(());
                    }
                    None => break,
                },

                () = tokio::time::sleep_until(next_cycle) => {
                    let started = Instant::now();
                    self.cycle().await;
                    next_cycle = next_deadline(started, self.cadence.interval());
                }
            }
        }

        tracing::info!("Clock sync service stopped");
    }

    async fn cycle(&mut self) {
        let resolved = match self.locator.resolve().await {
            Ok(resolved) => resolved,
            Err(SyncError::ResolutionThrottled { retry_in }) => {
                tracing::trace!(?retry_in, "No peer address yet");
                return;
            }
            Err(_) => {
                self.publish();
                return;
            }
        };

        if resolved.changed {
            tracing::info!(
                address = %resolved.address,
                "Reference peer changed, restarting lock phase"
            );
            self.model.reset();
            self.cadence.restart();
            self.publish();
        }

        match self.engine.probe_burst(resolved.address).await {
            Ok(sample) => {
                self.locator.record_success();
                self.model.apply(&sample);
                if self.cadence.record_burst() {
                    tracing::info!(
                        bursts = self.cadence.bursts_completed(),
                        interval = ?self.cadence.interval(),
                        "Lock phase complete, switching to steady cadence"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(peer = %resolved.address, error = %e, "Burst failed");
                self.failed_bursts += 1;
                self.locator.record_failure();
            }
        }
        self.publish();
    }

    async fn trigger(&mut self) -> Result<ProbeSample, SyncError> {
        let address = self.locator.cached_address().ok_or(SyncError::NoPeer)?;

        let result = self.engine.probe_burst(address).await;
        match &result {
            Ok(sample) => {
                self.locator.record_success();
                self.model.apply(sample);
            }
            Err(e) => {
                tracing::warn!(peer = %address, error = %e, "Manual burst failed");
                self.failed_bursts += 1;
                self.locator.record_failure();
            }
        }
        self.publish();
        result
    }

    fn publish(&self) {
        let status = SyncStatus {
            cadence: self.cadence,
            peer: self.locator.cached_address(),
            consecutive_failures: self.locator.cache().consecutive_failures,
            failed_bursts: self.failed_bursts,
        };
        self.status.send_replace(status);
    }
}

/// Handle to a running [`ClockSyncService`].
///
/// Dropping the handle stops the loop once its current burst finishes.
#[derive(Debug)]
pub struct ClockSyncHandle {
    reader: ClockReader,
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SyncStatus>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ClockSyncHandle {
    /// Conversion API for consumers
    #[must_use]
    pub fn reader(&self) -> ClockReader {
        self.reader.clone()
    }

    /// Latest published status
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Run one burst now against the cached peer and apply its sample.
    ///
    /// Does not advance the regular schedule.
    ///
    /// # Errors
    ///
    /// Returns `NoPeer` if no valid address is cached, the burst error if no
    /// probe succeeded, or `ServiceStopped` if the loop has exited.
    pub async fn try_trigger_probe(&self) -> Result<ProbeSample, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Trigger(tx))
            .await
            .map_err(|_| SyncError::ServiceStopped)?;
        rx.await.map_err(|_| SyncError::ServiceStopped)?
    }

    /// Like [`try_trigger_probe`](Self::try_trigger_probe), reporting only
    /// whether the model was updated
    pub async fn trigger_probe(&self) -> bool {
        match self.try_trigger_probe().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Manual probe did not update the model");
                false
            }
        }
    }

    /// Switch to a different reference peer.
    ///
    /// The address cache is cleared and the new source is looked up at once;
    /// a different address resets the model and restarts the lock phase.
    ///
    /// # Errors
    ///
    /// Returns `ServiceStopped` if the loop has exited.
    pub async fn set_peer(&self, peer: PeerSource) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::SetPeer(peer, tx))
            .await
            .map_err(|_| SyncError::ServiceStopped)?;
        rx.await.map_err(|_| SyncError::ServiceStopped)
    }

    /// Stop the loop and wait for it to exit. The reader keeps answering
    /// from the last model state.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Clock sync task ended abnormally");
            }
        }
    }

    /// Whether the loop is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ClockSyncHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
