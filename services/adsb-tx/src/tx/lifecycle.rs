//! Idle / transmitting state machine
//!
//! A begin request re-encodes the frame from the current identifier and
//! downlink format, so edits are always reflected in what goes out. Only a
//! `Done` or `Failed` report or the timeout return the machine to idle.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adsb::{encode_frame, DownlinkFormat, Frame, Identifier, StationProfile};

use super::sink::{FrameSink, SinkError};
use super::state::{TxOutcome, TxReport, TxState, TxStats};

/// Result of a begin request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Frame handed to the sink
    Started(Frame),
    /// A transmission is already in progress
    Ignored,
}

/// Transmission lifecycle around one RF collaborator
pub struct TxLifecycle<S> {
    sink: S,
    df: DownlinkFormat,
    ident: Identifier,
    station: StationProfile,
    state: TxState,
    timeout: Duration,
    stats: Arc<TxStats>,
}

impl<S: FrameSink> TxLifecycle<S> {
    pub fn new(
        sink: S,
        df: DownlinkFormat,
        ident: Identifier,
        station: StationProfile,
        timeout: Duration,
    ) -> Self {
        Self {
            sink,
            df,
            ident,
            station,
            state: TxState::Idle,
            timeout,
            stats: Arc::new(TxStats::new()),
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn stats(&self) -> Arc<TxStats> {
        self.stats.clone()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn downlink_format(&self) -> DownlinkFormat {
        self.df
    }

    pub fn identifier(&self) -> &Identifier {
        &self.ident
    }

    pub fn set_identifier(&mut self, ident: Identifier) {
        if ident.is_encodable() {
            debug!("Identifier set to '{}'", ident);
        } else {
            warn!(
                "Identifier '{}' has unsupported characters, will send '{}'",
                ident,
                ident.normalized()
            );
        }
        self.ident = ident;
    }

    pub fn set_downlink_format(&mut self, df: DownlinkFormat) {
        debug!("Downlink format set to {}", df);
        self.df = df;
    }

    /// The frame on air while transmitting, otherwise what the next begin would send.
    ///
    /// For display; only a begin counts as an encode.
    pub fn frame(&self) -> Frame {
        match self.state {
            TxState::Transmitting { frame, .. } => frame,
            TxState::Idle => encode_frame(self.df, &self.ident, &self.station),
        }
    }

    fn encode(&self) -> Frame {
        self.stats.record_encoded();
        encode_frame(self.df, &self.ident, &self.station)
    }

    /// When the current transmission times out, if one is running
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TxState::Idle => None,
            TxState::Transmitting { started, .. } => Some(started + self.timeout),
        }
    }

    /// Handle a begin request.
    ///
    /// A sink failure leaves the machine idle.
    pub fn begin(&mut self, now: Instant) -> Result<BeginOutcome, SinkError> {
        if !self.state.is_idle() {
            warn!("Transmission already in progress, ignoring begin request");
            self.stats.record_begin_ignored();
            return Ok(BeginOutcome::Ignored);
        }

        let frame = self.encode();
        if let Err(e) = self.sink.start(&frame) {
            self.stats.record_sink_failure();
            return Err(e);
        }

        info!(
            "Transmitting {} '{}' frame {} (CRC {})",
            self.df,
            self.ident.normalized(),
            frame,
            frame.checksum_hex()
        );
        self.state = TxState::Transmitting {
            started: now,
            frame,
            progress: 0,
        };
        self.stats.record_started();
        Ok(BeginOutcome::Started(frame))
    }

    /// Apply a report from the sink. Returns the outcome when it ends the transmission.
    pub fn on_report(&mut self, report: TxReport) -> Option<TxOutcome> {
        let TxState::Transmitting { started, frame, .. } = self.state else {
            debug!("Ignoring {:?} while idle", report);
            return None;
        };

        match report {
            TxReport::Progress(progress) => {
                self.state = TxState::Transmitting {
                    started,
                    frame,
                    progress,
                };
                None
            }
            TxReport::Done => {
                info!("Transmission complete");
                self.state = TxState::Idle;
                self.stats.record_completed();
                Some(TxOutcome::Completed)
            }
            TxReport::Failed => {
                warn!("Transmitter stopped before finishing frame {}", frame);
                self.state = TxState::Idle;
                self.stats.record_sink_failure();
                Some(TxOutcome::Failed)
            }
        }
    }

    /// Time out the current transmission if its deadline has passed
    pub fn check_timeout(&mut self, now: Instant) -> Option<TxOutcome> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        warn!(
            "No completion from transmitter after {:?}, returning to idle",
            self.timeout
        );
        self.sink.cancel();
        self.state = TxState::Idle;
        self.stats.record_timed_out();
        Some(TxOutcome::TimedOut)
    }

    /// Drop the current transmission without an outcome (collaborator gone)
    pub fn abort(&mut self) {
        if !self.state.is_idle() {
            self.sink.cancel();
            self.state = TxState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adsb::verify_checksum;

    /// Records frames instead of transmitting them
    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Frame>,
        cancels: usize,
        fail: bool,
    }

    impl FrameSink for RecordingSink {
        fn start(&mut self, frame: &Frame) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Disconnected);
            }
            self.frames.push(*frame);
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    fn lifecycle() -> TxLifecycle<RecordingSink> {
        TxLifecycle::new(
            RecordingSink::default(),
            DownlinkFormat::EXTENDED_SQUITTER,
            Identifier::new("KLM1023"),
            StationProfile::default(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_begin_from_idle_starts_once() {
        let mut tx = lifecycle();
        let now = Instant::now();

        let outcome = tx.begin(now).unwrap();
        let BeginOutcome::Started(frame) = outcome else {
            panic!("expected start, got {:?}", outcome);
        };
        assert_eq!(frame.to_hex(), "8D4840D6202CC371C32CE0576098");
        assert_eq!(tx.sink().frames, vec![frame]);
        assert!(matches!(tx.state(), TxState::Transmitting { progress: 0, .. }));
        assert_eq!(tx.stats().get_started(), 1);
    }

    #[test]
    fn test_begin_while_transmitting_is_noop() {
        let mut tx = lifecycle();
        let now = Instant::now();
        tx.begin(now).unwrap();

        assert_eq!(tx.begin(now).unwrap(), BeginOutcome::Ignored);
        assert_eq!(tx.begin(now).unwrap(), BeginOutcome::Ignored);
        assert_eq!(tx.sink().frames.len(), 1);
        assert_eq!(tx.stats().get_begin_ignored(), 2);
    }

    #[test]
    fn test_progress_keeps_transmitting() {
        let mut tx = lifecycle();
        tx.begin(Instant::now()).unwrap();

        for n in [0, 1, 61, 122, 199, 201] {
            assert_eq!(tx.on_report(TxReport::from_raw(n)), None);
            assert!(matches!(tx.state(), TxState::Transmitting { progress, .. } if progress == n as u32));
        }
    }

    #[test]
    fn test_done_returns_to_idle() {
        let mut tx = lifecycle();
        tx.begin(Instant::now()).unwrap();

        assert_eq!(tx.on_report(TxReport::from_raw(200)), Some(TxOutcome::Completed));
        assert_eq!(tx.state(), TxState::Idle);
        assert_eq!(tx.stats().get_completed(), 1);
    }

    #[test]
    fn test_failed_report_returns_to_idle() {
        let mut tx = lifecycle();
        tx.begin(Instant::now()).unwrap();
        tx.on_report(TxReport::Progress(40));

        assert_eq!(tx.on_report(TxReport::Failed), Some(TxOutcome::Failed));
        assert_eq!(tx.state(), TxState::Idle);
        assert_eq!(tx.deadline(), None);
        assert_eq!(tx.stats().get_sink_failures(), 1);
        assert_eq!(tx.stats().get_completed(), 0);

        // A later begin starts normally
        assert!(matches!(tx.begin(Instant::now()).unwrap(), BeginOutcome::Started(_)));
    }

    #[test]
    fn test_only_begin_counts_as_encode() {
        let mut tx = lifecycle();
        tx.frame();
        tx.begin(Instant::now()).unwrap();
        for n in 0..10 {
            tx.on_report(TxReport::Progress(n * 12));
            tx.frame();
        }
        tx.on_report(TxReport::Done);
        tx.frame();

        assert_eq!(tx.stats().get_encoded(), 1);
        assert_eq!(tx.stats().get_started(), 1);
    }

    #[test]
    fn test_frame_while_transmitting_is_the_one_sent() {
        let mut tx = lifecycle();
        let BeginOutcome::Started(sent) = tx.begin(Instant::now()).unwrap() else {
            panic!("expected start");
        };

        tx.set_identifier(Identifier::new("ABCDEFGH"));
        tx.on_report(TxReport::Progress(61));
        assert_eq!(tx.frame(), sent);
        assert_eq!(tx.frame().checksum_hex(), "576098");

        tx.on_report(TxReport::Done);
        assert_eq!(tx.frame().identifier_field(), 0x0420C41461C8);
    }

    #[test]
    fn test_reports_while_idle_are_ignored() {
        let mut tx = lifecycle();
        assert_eq!(tx.on_report(TxReport::Done), None);
        assert_eq!(tx.on_report(TxReport::Progress(5)), None);
        assert_eq!(tx.on_report(TxReport::Failed), None);
        assert_eq!(tx.state(), TxState::Idle);
        assert_eq!(tx.stats().get_completed(), 0);
    }

    #[test]
    fn test_reenterable() {
        let mut tx = lifecycle();
        for _ in 0..3 {
            assert!(matches!(tx.begin(Instant::now()).unwrap(), BeginOutcome::Started(_)));
            assert_eq!(tx.on_report(TxReport::Done), Some(TxOutcome::Completed));
        }
        assert_eq!(tx.sink().frames.len(), 3);
    }

    #[test]
    fn test_begin_reencodes_after_edit() {
        let mut tx = lifecycle();
        tx.begin(Instant::now()).unwrap();
        tx.on_report(TxReport::Done);

        tx.set_identifier(Identifier::new("ABCDEFGH"));
        tx.set_downlink_format(DownlinkFormat::EXTENDED_SQUITTER_NON_TRANSPONDER);
        tx.begin(Instant::now()).unwrap();

        let frames = &tx.sink().frames;
        assert_ne!(frames[0], frames[1]);
        assert_eq!(frames[1].downlink_format(), 18);
        assert_eq!(frames[1].identifier_field(), 0x0420C41461C8);
        assert!(verify_checksum(&frames[1]));
    }

    #[test]
    fn test_timeout_returns_to_idle() {
        let mut tx = lifecycle();
        let start = Instant::now();
        tx.begin(start).unwrap();

        assert_eq!(tx.deadline(), Some(start + Duration::from_secs(5)));
        assert_eq!(tx.check_timeout(start + Duration::from_secs(4)), None);
        assert!(!tx.state().is_idle());

        assert_eq!(
            tx.check_timeout(start + Duration::from_secs(5)),
            Some(TxOutcome::TimedOut)
        );
        assert_eq!(tx.state(), TxState::Idle);
        assert_eq!(tx.sink().cancels, 1);
        assert_eq!(tx.stats().get_timed_out(), 1);
        assert_eq!(tx.check_timeout(start + Duration::from_secs(60)), None);
    }

    #[test]
    fn test_sink_failure_stays_idle() {
        let mut tx = lifecycle();
        tx.sink.fail = true;

        assert!(tx.begin(Instant::now()).is_err());
        assert_eq!(tx.state(), TxState::Idle);
        assert_eq!(tx.stats().get_sink_failures(), 1);
        assert_eq!(tx.stats().get_started(), 0);
    }
}
