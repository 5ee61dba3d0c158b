//! Async driver for the transmission lifecycle
//!
//! Owns a [`TxLifecycle`], feeds it reports from the sink and applies the
//! completion timeout. Requests arrive as [`TxCommand`]s; every state change is
//! published as a [`TxStatus`] for display.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::adsb::{DownlinkFormat, Identifier};

use super::lifecycle::{BeginOutcome, TxLifecycle};
use super::sink::{FrameSink, SinkError};
use super::state::{TxOutcome, TxReport, TxState};

/// Requests from the operator side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCommand {
    Begin,
    SetIdentifier(Identifier),
    SetDownlinkFormat(DownlinkFormat),
}

/// Snapshot published after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatus {
    pub transmitting: bool,
    pub progress: u32,
    /// Parity of the frame on air (or of the next one when idle), 6 hex digits
    pub checksum_hex: String,
    pub frame_hex: String,
    /// Set when this status ends a transmission
    pub outcome: Option<TxOutcome>,
    pub timestamp_ms: u64,
}

/// Drives one lifecycle from its report channel
pub struct TxRunner<S> {
    lifecycle: TxLifecycle<S>,
    reports: mpsc::UnboundedReceiver<TxReport>,
}

impl<S: FrameSink> TxRunner<S> {
    pub fn new(lifecycle: TxLifecycle<S>, reports: mpsc::UnboundedReceiver<TxReport>) -> Self {
        Self { lifecycle, reports }
    }

    pub fn lifecycle(&self) -> &TxLifecycle<S> {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut TxLifecycle<S> {
        &mut self.lifecycle
    }

    /// Run one transmission to completion or timeout
    pub async fn transmit(&mut self) -> Result<TxOutcome, SinkError> {
        self.drain_stale_reports();

        if let BeginOutcome::Ignored = self.lifecycle.begin(Instant::now())? {
            // Not reachable through this method; finish whatever is running
            debug!("Waiting on transmission already in progress");
        }

        loop {
            if let Some(outcome) = self.next_outcome().await? {
                return Ok(outcome);
            }
        }
    }

    /// Process commands until the command channel closes
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<TxCommand>,
        status_tx: mpsc::Sender<TxStatus>,
    ) -> Result<(), SinkError> {
        info!("Transmission runner started");
        self.publish(&status_tx, None).await;

        loop {
            let deadline = self.lifecycle.deadline();

            // Commands first so a begin queued ahead of a report is seen in order
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        info!("Command channel closed");
                        break;
                    };
                    self.apply(command, &status_tx).await;
                }
                report = self.reports.recv(), if !self.lifecycle.state().is_idle() => {
                    let Some(report) = report else {
                        error!("Transmitter report channel closed");
                        self.lifecycle.abort();
                        self.publish(&status_tx, None).await;
                        return Err(SinkError::Disconnected);
                    };
                    let outcome = self.lifecycle.on_report(report);
                    self.publish(&status_tx, outcome).await;
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(outcome) = self.lifecycle.check_timeout(Instant::now()) {
                        self.publish(&status_tx, Some(outcome)).await;
                    }
                }
            }
        }

        self.lifecycle.abort();
        info!("Transmission runner stopped. {}", self.lifecycle.stats().summary());
        Ok(())
    }

    async fn apply(&mut self, command: TxCommand, status_tx: &mpsc::Sender<TxStatus>) {
        match command {
            TxCommand::Begin => {
                if self.lifecycle.state().is_idle() {
                    self.drain_stale_reports();
                }
                match self.lifecycle.begin(Instant::now()) {
                    Ok(BeginOutcome::Started(_)) => self.publish(status_tx, None).await,
                    Ok(BeginOutcome::Ignored) => {}
                    Err(e) => {
                        error!("Failed to start transmission: {}", e);
                        self.publish(status_tx, Some(TxOutcome::Failed)).await;
                    }
                }
            }
            TxCommand::SetIdentifier(ident) => {
                self.lifecycle.set_identifier(ident);
                self.publish(status_tx, None).await;
            }
            TxCommand::SetDownlinkFormat(df) => {
                self.lifecycle.set_downlink_format(df);
                self.publish(status_tx, None).await;
            }
        }
    }

    /// Wait for the next report or the deadline, whichever comes first
    async fn next_outcome(&mut self) -> Result<Option<TxOutcome>, SinkError> {
        let Some(deadline) = self.lifecycle.deadline() else {
            return Err(SinkError::Disconnected);
        };

        tokio::select! {
            report = self.reports.recv() => match report {
                Some(report) => Ok(self.lifecycle.on_report(report)),
                None => {
                    self.lifecycle.abort();
                    Err(SinkError::Disconnected)
                }
            },
            _ = sleep_until(deadline) => Ok(self.lifecycle.check_timeout(Instant::now())),
        }
    }

    /// Reports left over from a transmission that already ended
    fn drain_stale_reports(&mut self) {
        while let Ok(report) = self.reports.try_recv() {
            debug!("Dropping stale report {:?}", report);
        }
    }

    async fn publish(&self, status_tx: &mpsc::Sender<TxStatus>, outcome: Option<TxOutcome>) {
        let frame = self.lifecycle.frame();
        let (transmitting, progress) = match self.lifecycle.state() {
            TxState::Idle => (false, 0),
            TxState::Transmitting { progress, .. } => (true, progress),
        };

        let status = TxStatus {
            transmitting,
            progress,
            checksum_hex: frame.checksum_hex(),
            frame_hex: frame.to_hex(),
            outcome,
            timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
        };

        if let Err(e) = status_tx.send(status).await {
            debug!("Failed to publish transmitter status: {}", e);
        }
    }
}
