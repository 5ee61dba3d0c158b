//! Transmission lifecycle: idle / transmitting around an RF collaborator

mod lifecycle;
mod runner;
mod sink;
mod state;

pub use lifecycle::{BeginOutcome, TxLifecycle};
pub use runner::{TxCommand, TxRunner, TxStatus};
pub use sink::{FrameSink, LineSink, ProcessSink, SinkError};
pub use state::{TxOutcome, TxReport, TxState, TxStats, DONE_SENTINEL, PROGRESS_MAX};
