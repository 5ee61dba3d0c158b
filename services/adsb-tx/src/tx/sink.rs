//! RF collaborators: where encoded frames go to be transmitted
//!
//! A sink takes a frame when a transmission begins and reports progress back
//! on the channel it was built with.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adsb::Frame;

use super::state::TxReport;

/// Errors handing a frame to the RF collaborator
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to spawn transmitter {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transmitter I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transmitter report channel closed")]
    Disconnected,
}

/// Hands frames to whatever actually modulates them
pub trait FrameSink {
    /// Begin transmitting `frame`. Progress arrives on the sink's report channel.
    fn start(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Abandon the current transmission, if any
    fn cancel(&mut self) {}
}

/// Writes each frame as a `*<hex>;` line and reports done immediately
pub struct LineSink<W> {
    out: W,
    reports: mpsc::UnboundedSender<TxReport>,
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W, reports: mpsc::UnboundedSender<TxReport>) -> Self {
        Self { out, reports }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for LineSink<W> {
    fn start(&mut self, frame: &Frame) -> Result<(), SinkError> {
        writeln!(self.out, "{}", frame.to_line())?;
        self.out.flush()?;
        self.reports
            .send(TxReport::Done)
            .map_err(|_| SinkError::Disconnected)
    }
}

/// Runs an external transmitter program once per frame.
///
/// The program gets the frame line (`*<hex>;`) as its last argument. Every
/// integer it prints on stdout is relayed through [`TxReport::from_raw`]; a
/// successful exit counts as done, any other exit as [`TxReport::Failed`].
pub struct ProcessSink {
    program: PathBuf,
    args: Vec<String>,
    reports: mpsc::UnboundedSender<TxReport>,
    current: Option<JoinHandle<()>>,
}

impl ProcessSink {
    pub fn new(
        program: &Path,
        args: Vec<String>,
        reports: mpsc::UnboundedSender<TxReport>,
    ) -> Self {
        Self {
            program: program.to_path_buf(),
            args,
            reports,
            current: None,
        }
    }
}

impl FrameSink for ProcessSink {
    fn start(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let line = frame.to_line();
        info!("Starting transmitter: {} {}", self.program.display(), line);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SinkError::Spawn {
                path: self.program.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("transmitter stdout not captured"))?;
        let stderr = child.stderr.take();
        let reports = self.reports.clone();

        let handle = tokio::spawn(async move {
            // Transmitters log to stderr
            let stderr_handle = stderr.map(|stderr| {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        if !line.is_empty() {
                            info!("transmitter: {}", line);
                        }
                    }
                })
            });

            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_progress_line(&line) {
                        Some(report) => {
                            if reports.send(report).is_err() {
                                debug!("Report channel closed, dropping transmitter output");
                                break;
                            }
                        }
                        None => debug!("Ignoring transmitter output: {}", line),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error reading transmitter output: {}", e);
                        break;
                    }
                }
            }

            let report = match child.wait().await {
                Ok(status) if status.success() => TxReport::Done,
                Ok(status) => {
                    warn!("Transmitter exited with {}", status);
                    TxReport::Failed
                }
                Err(e) => {
                    error!("Failed to wait for transmitter: {}", e);
                    TxReport::Failed
                }
            };
            let _ = reports.send(report);

            if let Some(handle) = stderr_handle {
                let _ = handle.await;
            }
        });

        if let Some(previous) = self.current.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            // Dropping the child with the task kills it
            handle.abort();
        }
    }
}

/// Parse one line of transmitter stdout as a raw progress value
fn parse_progress_line(line: &str) -> Option<TxReport> {
    line.trim().parse::<i32>().ok().map(TxReport::from_raw)
}
