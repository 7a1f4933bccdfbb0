use crate::batch::run_aggregator;
use crate::bus::{FrameSink, TraceBus};
use crate::config::load_config;
use crate::decode::{CanboatDecoder, FrameDecoder};
use crate::delta::{StandardMapper, StdoutDeltaSink, UpdateBuilder};
use crate::player::{Emit, PlaybackScheduler};
use crate::source::{LogReader, Normalizer};
use crate::stats::SkipCounters;
use crate::timeframe::TimeWindow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("timeframe error: {0}")]
    Timeframe(#[from] crate::timeframe::TimeframeError),

    #[error("source reader error: {0}")]
    SourceReader(#[from] crate::source::ReaderError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/n2kplay/config.yml");
            eprintln!("  /etc/n2kplay/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'n2kplay config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_replay(&config_path).await.map_err(|e| e.into())
}

async fn run_replay(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");

    // All fatal errors happen here, before any line is processed
    let config = load_config(config_path)?;
    let window = TimeWindow::new(&config.timeframe)?;

    let mut reader = LogReader::new(&config.input.path);
    reader.open()?;

    info!(
        path = %config.input.path.display(),
        realtime = config.playback.realtime,
        original_timestamps = config.playback.original_timestamps,
        timeframe = window.enabled(),
        "Starting replay"
    );

    let normalizer = Normalizer::new();
    let decoder = CanboatDecoder::new();

    let builder = UpdateBuilder::new(
        Box::new(StandardMapper::new()),
        Box::new(StdoutDeltaSink::new()),
    );
    let (offer_tx, offer_rx) = mpsc::channel(config.batch.buffer_limit);
    let aggregator = tokio::spawn(run_aggregator(
        offer_rx,
        builder,
        config.batch.quiescence,
    ));

    let frame_sink: Option<Box<dyn FrameSink>> = if config.bus.enabled {
        info!(interface = %config.bus.interface, "Bus replay enabled");
        Some(Box::new(TraceBus::new(&config.bus.interface)))
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut scheduler = PlaybackScheduler::new(
        &config.playback,
        window,
        offer_tx,
        frame_sink,
        shutdown_rx,
    );

    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    let mut skips = SkipCounters::default();
    let mut lines_read = 0u64;

    loop {
        if *shutdown_tx.borrow() {
            info!("Stopping replay");
            break;
        }

        let Some(line) = reader.next_line()? else {
            info!(lines_read, "Done with log file");
            break;
        };
        lines_read += 1;

        let Some(record) = normalizer.normalize(&line) else {
            skips.normalize_misses += 1;
            continue;
        };

        let message = match decoder.decode(&record.payload) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "decode failure");
                skips.decode_failures += 1;
                continue;
            }
        };

        match scheduler.offer(message, record.timestamp_ms).await {
            Emit::Sent => {}
            Emit::OutOfWindow => skips.window_drops += 1,
            Emit::Stopped => break,
        }
    }

    // Dropping the scheduler closes the offer channel, which triggers the
    // aggregator's final flush of every open batch group.
    drop(scheduler);
    let mut stats = aggregator.await?;
    stats.merge_skips(skips);

    if config.report.enabled {
        info!("\n{}", stats.render());
    }

    Ok(())
}
