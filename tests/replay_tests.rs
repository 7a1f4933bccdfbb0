/// End-to-end replay tests
///
/// These drive the full pipeline the way the CLI wires it: normalizer →
/// decoder → playback scheduler → batch aggregator → update builder, with an
/// in-memory sink instead of stdout.
use n2kplay::batch::run_aggregator;
use n2kplay::config::types::PlaybackConfig;
use n2kplay::decode::{CanboatDecoder, FrameDecoder};
use n2kplay::delta::{MemorySink, StandardMapper, Update, UpdateBuilder};
use n2kplay::player::PlaybackScheduler;
use n2kplay::source::{LogReader, Normalizer};
use n2kplay::stats::{RunStatistics, SkipCounters};
use n2kplay::timeframe::TimeWindow;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Replay a slice of raw log lines through the full pipeline. Returns the
/// published updates, the run statistics, and how long the scheduling loop
/// took (mocked time under a paused runtime).
async fn replay_lines(
    lines: &[&str],
    playback: PlaybackConfig,
    quiescence: Duration,
) -> (Vec<Update>, RunStatistics, Duration) {
    let normalizer = Normalizer::new();
    let decoder = CanboatDecoder::new();

    let sink = MemorySink::new();
    let builder = UpdateBuilder::new(Box::new(StandardMapper::new()), Box::new(sink.clone()));
    let (offer_tx, offer_rx) = mpsc::channel(64);
    let aggregator = tokio::spawn(run_aggregator(offer_rx, builder, quiescence));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut scheduler = PlaybackScheduler::new(
        &playback,
        TimeWindow::disabled(),
        offer_tx,
        None,
        shutdown_rx,
    );

    let mut skips = SkipCounters::default();
    let start = Instant::now();

    for line in lines {
        let Some(record) = normalizer.normalize(line) else {
            skips.normalize_misses += 1;
            continue;
        };
        match decoder.decode(&record.payload) {
            Ok(message) => {
                scheduler.offer(message, record.timestamp_ms).await;
            }
            Err(_) => skips.decode_failures += 1,
        }
    }

    let elapsed = start.elapsed();
    drop(scheduler);
    drop(shutdown_tx);

    let mut stats = aggregator.await.unwrap();
    stats.merge_skips(skips);
    (sink.published(), stats, elapsed)
}

fn realtime_playback() -> PlaybackConfig {
    PlaybackConfig {
        realtime: true,
        original_timestamps: true,
    }
}

fn fast_playback() -> PlaybackConfig {
    PlaybackConfig {
        realtime: false,
        original_timestamps: true,
    }
}

#[tokio::test(start_paused = true)]
async fn test_semicolon_log_replays_with_original_timing() {
    let lines = [
        "1000;x;1,129025,5,255,8,10,20,30,40,50,60,70,80",
        "1300;x;1,129025,5,255,8,11,21,31,41,51,61,71,81",
    ];

    let (published, stats, elapsed) =
        replay_lines(&lines, realtime_playback(), Duration::from_millis(100)).await;

    // The quiescence window (100ms) elapses during the 300ms pacing gap, so
    // both frames publish separately despite sharing a source key.
    assert_eq!(published.len(), 2);
    assert_eq!(stats.total_published, 2);

    for update in &published {
        assert_eq!(update.source, "n2kplay.129025.5");
        assert_eq!(update.values[0].path, "navigation.position");
    }
    assert_eq!(published[0].timestamp.timestamp_millis(), 1000);
    assert_eq!(published[1].timestamp.timestamp_millis(), 1300);

    // Second emission is paced ~300ms after the first's scheduling point
    assert!(elapsed >= Duration::from_millis(300));

    assert_eq!(stats.first_timestamp_ms, Some(1000));
    assert_eq!(stats.last_timestamp_ms, Some(1300));
}

#[tokio::test(start_paused = true)]
async fn test_burst_for_one_source_coalesces() {
    let lines = [
        "1000;x;1,129025,5,255,8,10,20,30,40,50,60,70,80",
        "1010;x;1,129025,5,255,8,11,21,31,41,51,61,71,81",
        "1020;x;1,129025,5,255,8,12,22,32,42,52,62,72,82",
        "1030;x;1,129025,5,255,8,13,23,33,43,53,63,73,83",
        "1040;x;1,129025,5,255,8,14,24,34,44,54,64,74,84",
    ];

    // Realtime pacing stays on, but the 10ms gaps never outlast the 100ms
    // quiescence window, so the burst collapses into the final flush.
    let (published, stats, _) =
        replay_lines(&lines, realtime_playback(), Duration::from_millis(100)).await;

    assert_eq!(published.len(), 1);
    assert_eq!(stats.total_published, 1);
    // Last offered message's data wins
    assert_eq!(published[0].timestamp.timestamp_millis(), 1040);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_encodings_and_noise() {
    // prio 2, PGN 129025, src 5 → 29-bit id 09F80105
    let lines = [
        "1000;x;1,129025,5,255,8,10,20,30,40,50,60,70,80",
        "(1700000000.000) vcan0 09F80105#0011223344556677",
        "vcan0 09F80105 [8] 00 11 22 33 44 55 66 77",
        "2023-06-15T12:00:00.000Z,2,127250,12,255,8,00,98,3a,ff,7f,ff,7f,fd",
        "# comment noise",
        "not a frame at all",
        "1000;x;1,60928,3,255,8,00,00,00,00,00,00,00,00",
    ];

    let (published, stats, _) =
        replay_lines(&lines, fast_playback(), Duration::from_millis(100)).await;

    assert!(!published.is_empty());
    assert_eq!(stats.skips.normalize_misses, 2);
    // PGN 60928 is not in the decoder's working set
    assert_eq!(stats.skips.decode_failures, 1);
    assert!(published.iter().any(|u| u.source == "n2kplay.127250.12"));
    assert!(published
        .iter()
        .any(|u| u.values.iter().any(|v| v.path == "navigation.headingMagnetic")));
}

#[tokio::test(start_paused = true)]
async fn test_distinct_sources_publish_independently() {
    let lines = [
        "1000;x;1,129025,5,255,8,10,20,30,40,50,60,70,80",
        "1001;x;1,129025,9,255,8,10,20,30,40,50,60,70,80",
        "1002;x;1,128267,3,255,8,00,fa,00,00,00,64,00,ff",
    ];

    let (published, stats, _) =
        replay_lines(&lines, fast_playback(), Duration::from_millis(100)).await;

    assert_eq!(published.len(), 3);
    assert_eq!(stats.per_source.len(), 3);
    assert_eq!(stats.per_message.len(), 3);

    let depth = published
        .iter()
        .find(|u| u.source == "n2kplay.128267.3")
        .unwrap();
    assert!(depth
        .values
        .iter()
        .any(|v| v.path == "environment.depth.belowTransducer"));
}

#[tokio::test(start_paused = true)]
async fn test_log_file_replay_via_reader() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "1000;x;1,129025,5,255,8,10,20,30,40,50,60,70,80").unwrap();
    writeln!(file, "garbage line").unwrap();
    writeln!(file, "1100;x;1,129026,5,255,8,00,fc,10,27,e8,03,ff,ff").unwrap();
    file.flush().unwrap();

    let mut reader = LogReader::new(file.path());
    let mut lines = Vec::new();
    while let Some(line) = reader.next_line().unwrap() {
        lines.push(line);
    }

    let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (published, stats, _) =
        replay_lines(&line_refs, fast_playback(), Duration::from_millis(50)).await;

    assert_eq!(published.len(), 2);
    assert_eq!(stats.skips.normalize_misses, 1);
    assert!(published
        .iter()
        .any(|u| u.values.iter().any(|v| v.path == "navigation.speedOverGround")));
}
