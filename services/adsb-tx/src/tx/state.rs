//! Transmission state, progress reports and counters

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;

use crate::adsb::Frame;

/// Raw progress value the baseband uses to signal "done"
pub const DONE_SENTINEL: i32 = 200;

/// Full-scale progress value reported while transmitting
pub const PROGRESS_MAX: u32 = 122;

/// Report from the RF collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxReport {
    Progress(u32),
    Done,
    /// The collaborator stopped without finishing the transmission
    Failed,
}

impl TxReport {
    /// Split the collaborator's single integer channel into progress and done.
    ///
    /// Negative values clamp to zero progress.
    pub fn from_raw(n: i32) -> Self {
        if n == DONE_SENTINEL {
            Self::Done
        } else {
            Self::Progress(n.max(0) as u32)
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    /// `frame` is what the collaborator was handed, not a re-encode
    Transmitting {
        started: Instant,
        frame: Frame,
        progress: u32,
    },
}

impl TxState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// How a transmission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Completed,
    TimedOut,
    /// The sink refused the frame or the transmitter exited without finishing
    Failed,
}

/// Counters for one transmitter
#[derive(Debug, Default)]
pub struct TxStats {
    pub frames_encoded: AtomicU64,
    pub started: AtomicU64,
    pub completed: AtomicU64,
    pub timed_out: AtomicU64,
    pub begin_ignored: AtomicU64,
    pub sink_failures: AtomicU64,
}

impl TxStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_encoded(&self) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_begin_ignored(&self) {
        self.begin_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_encoded(&self) -> u64 {
        self.frames_encoded.load(Ordering::Relaxed)
    }

    pub fn get_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn get_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn get_timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn get_begin_ignored(&self) -> u64 {
        self.begin_ignored.load(Ordering::Relaxed)
    }

    pub fn get_sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> String {
        format!(
            "Encoded: {} | Started: {} | Completed: {} | Timed out: {} | Ignored: {} | Sink failures: {}",
            self.get_encoded(),
            self.get_started(),
            self.get_completed(),
            self.get_timed_out(),
            self.get_begin_ignored(),
            self.get_sink_failures(),
        )
    }
}
