//! ADS-B TX - extended squitter identification frame transmitter
//!
//! Encodes a DF17 identification frame from environment configuration and
//! hands it to an external transmitter (or prints it in `*<hex>;` form).

use std::io;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adsb_tx::adsb::verify_checksum;
use adsb_tx::tx::{
    FrameSink, LineSink, ProcessSink, TxCommand, TxLifecycle, TxOutcome, TxReport, TxRunner,
    TxStatus, PROGRESS_MAX,
};
use adsb_tx::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adsb_tx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    info!("===========================================");
    info!("   ADS-B TX - Extended Squitter Encoder");
    info!("===========================================");

    // Load configuration
    let config = Config::from_env().context("Invalid configuration")?;

    info!("Configuration:");
    info!("  Downlink format: {}", config.downlink_format);
    info!("  Callsign: '{}'", config.callsign.normalized());
    if !config.callsign.is_encodable() {
        warn!("  Callsign '{}' has unsupported characters, sent as spaces", config.callsign);
    }
    info!("  ICAO address: {:06X}", config.station.icao_address);
    info!("  Capability: {}", config.station.capability);
    info!("  Type code byte: {:02X}", config.station.type_code);
    info!("  Timeout: {:?}", config.tx_timeout);
    info!("  Repeat: {}", config.tx_repeat);

    let (report_tx, report_rx) = mpsc::unbounded_channel::<TxReport>();

    match &config.tx_command {
        Some(program) => {
            info!("  Transmitter: {}", program.display());
            let sink = ProcessSink::new(program, config.tx_args.clone(), report_tx);
            run(&config, sink, report_rx).await
        }
        None => {
            info!("  Transmitter: stdout");
            let sink = LineSink::new(io::stdout(), report_tx);
            run(&config, sink, report_rx).await
        }
    }
}

async fn run<S>(
    config: &Config,
    sink: S,
    report_rx: mpsc::UnboundedReceiver<TxReport>,
) -> Result<()>
where
    S: FrameSink + Send + Sync + 'static,
{
    let lifecycle = TxLifecycle::new(
        sink,
        config.downlink_format,
        config.callsign.clone(),
        config.station,
        config.tx_timeout,
    );

    let frame = lifecycle.frame();
    if !verify_checksum(&frame) {
        // Parity is computed locally; a mismatch means the encoder is broken
        bail!("Encoded frame {} fails its own parity check", frame);
    }
    info!("Frame: {} (CRC {})", frame, frame.checksum_hex());

    let stats = lifecycle.stats();
    let runner = TxRunner::new(lifecycle, report_rx);

    let (cmd_tx, cmd_rx) = mpsc::channel::<TxCommand>(16);
    let (status_tx, mut status_rx) = mpsc::channel::<TxStatus>(100);
    let runner_handle = tokio::spawn(runner.run(cmd_rx, status_tx));

    let mut completed = 0u32;
    'transmissions: for n in 1..=config.tx_repeat {
        info!("Transmission {}/{}", n, config.tx_repeat);
        cmd_tx
            .send(TxCommand::Begin)
            .await
            .context("Transmission runner stopped")?;

        loop {
            tokio::select! {
                status = status_rx.recv() => {
                    let Some(status) = status else {
                        warn!("Status channel closed");
                        break 'transmissions;
                    };
                    match status.outcome {
                        Some(TxOutcome::Completed) => {
                            completed += 1;
                            break;
                        }
                        Some(TxOutcome::TimedOut) => {
                            warn!("Transmission {} timed out", n);
                            break;
                        }
                        Some(TxOutcome::Failed) => {
                            error!("Transmission {} failed, giving up", n);
                            break 'transmissions;
                        }
                        None if status.transmitting => {
                            debug!(
                                "Progress {}/{} (CRC {})",
                                status.progress, PROGRESS_MAX, status.checksum_hex
                            );
                        }
                        None => {}
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break 'transmissions;
                }
            }
        }
    }

    // Closing the command channel stops the runner
    drop(cmd_tx);
    drop(status_rx);
    match runner_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Transmission runner failed: {}", e),
        Err(e) => error!("Transmission runner panicked: {}", e),
    }

    info!("[Stats] {}", stats.summary());
    info!("Shutdown complete. Transmissions completed: {}/{}", completed, config.tx_repeat);
    Ok(())
}
