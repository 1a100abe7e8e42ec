//! End-to-end pipeline runs over real files: CSV events in, atomically
//! written result files out.

use std::path::{Path, PathBuf};

use streammark::streammark::datagen::{generate_events, write_events_csv, DatagenConfig};
use streammark::{ExperimentConfig, PipelineError, PipelineRunner, WindowDiscipline};
use tempfile::TempDir;

async fn write_input(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, body).await.unwrap();
    path
}

/// Parse result rows as (key, start, end, count, lag), skipping the header.
fn parse_rows(body: &str) -> Vec<(String, i64, i64, u64, i64)> {
    body.lines()
        .skip(1)
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 5, "unexpected row: {line}");
            (
                fields[0].to_string(),
                fields[1].parse().unwrap(),
                fields[2].parse().unwrap(),
                fields[3].parse().unwrap(),
                fields[4].parse().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_three_event_periodic_run_produces_expected_windows() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "events.csv", "a,0,1.0\na,50,1.0\na,150,1.0\n").await;
    let output = dir.path().join("results.txt");

    let runner = PipelineRunner::new(ExperimentConfig::periodic(100, 0, 10)).unwrap();
    let summary = runner.execute_file(&input, &output).await.unwrap();

    assert_eq!(summary.events_read, 3);
    assert_eq!(summary.events_counted, 3);
    assert_eq!(summary.windows_fired, 2);
    assert_eq!(summary.late_events_dropped, 0);

    let rows = parse_rows(&tokio::fs::read_to_string(&output).await.unwrap());
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].0.as_str(), rows[0].1, rows[0].2, rows[0].3), ("a", 0, 100, 2));
    assert_eq!((rows[1].0.as_str(), rows[1].1, rows[1].2, rows[1].3), ("a", 100, 200, 1));
    assert!(rows.iter().all(|r| r.4 >= 0), "lag must never be negative");
}

#[tokio::test]
async fn test_in_order_stream_conserves_counts_across_windows() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("events.csv");
    let events = generate_events(&DatagenConfig {
        events: 1000,
        keys: 1,
        interval_ms: 10,
        disorder_ms: 0,
        seed: 5,
    });
    write_events_csv(&input, &events).await.unwrap();
    let output = dir.path().join("results.txt");

    // Period far beyond the run time: every window fires in the flush.
    let runner = PipelineRunner::new(ExperimentConfig::periodic(100, 0, 3_600_000)).unwrap();
    let summary = runner.execute_file(&input, &output).await.unwrap();

    assert_eq!(summary.events_read, 1000);
    assert_eq!(summary.events_counted, 1000);
    assert_eq!(summary.late_events_dropped, 0);
    // Timestamps 10..=10000 span windows [0,100) through [10000,10100).
    assert_eq!(summary.windows_fired, 101);

    let rows = parse_rows(&tokio::fs::read_to_string(&output).await.unwrap());
    let total: u64 = rows.iter().map(|r| r.3).sum();
    assert_eq!(total, 1000);
}

#[tokio::test]
async fn test_adaptive_run_accounts_for_every_event() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("events.csv");
    let events = generate_events(&DatagenConfig {
        events: 2000,
        keys: 4,
        interval_ms: 10,
        disorder_ms: 300,
        seed: 99,
    });
    write_events_csv(&input, &events).await.unwrap();
    let output = dir.path().join("results.txt");

    let runner =
        PipelineRunner::new(ExperimentConfig::adaptive(100, 1000, 1.1, 1.0, 0.01)).unwrap();
    let summary = runner.execute_file(&input, &output).await.unwrap();

    assert_eq!(summary.events_read, 2000);
    assert_eq!(
        summary.events_counted + summary.late_events_dropped,
        summary.events_read
    );
    assert!(summary.watermarks_emitted >= 1);

    let rows = parse_rows(&tokio::fs::read_to_string(&output).await.unwrap());
    let total: u64 = rows.iter().map(|r| r.3).sum();
    assert_eq!(total, summary.events_counted);
    assert!(rows.iter().all(|r| r.4 >= 0), "lag must never be negative");
}

#[tokio::test]
async fn test_malformed_input_fails_without_leaving_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "events.csv", "a,0,1.0\nnot an event\n").await;
    let output = dir.path().join("results.txt");

    let runner = PipelineRunner::new(ExperimentConfig::periodic(100, 0, 10)).unwrap();
    let err = runner.execute_file(&input, &output).await.unwrap_err();

    assert!(matches!(err, PipelineError::MalformedEvent { line: 2, .. }));
    assert!(!output.exists(), "failed run must not satisfy the skip-check");
    assert!(!dir.path().join("results.txt.tmp").exists());
}

#[tokio::test]
async fn test_rerun_overwrites_existing_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "events.csv", "a,0,1.0\na,150,1.0\n").await;
    let output = dir.path().join("results.txt");

    // A period beyond the run time keeps both runs byte-identical: every
    // window fires in the end-of-input flush.
    let runner = PipelineRunner::new(ExperimentConfig::periodic(100, 0, 3_600_000)).unwrap();
    runner.execute_file(&input, &output).await.unwrap();
    let first = tokio::fs::read_to_string(&output).await.unwrap();

    runner.execute_file(&input, &output).await.unwrap();
    let second = tokio::fs::read_to_string(&output).await.unwrap();

    assert_eq!(parse_rows(&first).len(), 2);
    assert_eq!(parse_rows(&first), parse_rows(&second));
}

#[tokio::test]
async fn test_count_triggered_discipline_writes_batch_rows() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("events.csv");
    let events = generate_events(&DatagenConfig {
        events: 1000,
        keys: 2,
        interval_ms: 10,
        disorder_ms: 50,
        seed: 13,
    });
    write_events_csv(&input, &events).await.unwrap();
    let output = dir.path().join("counts.txt");

    let runner = PipelineRunner::new(ExperimentConfig::periodic(100, 0, 10))
        .unwrap()
        .with_discipline(WindowDiscipline::GlobalCount { trigger: 400 });
    let summary = runner.execute_file(&input, &output).await.unwrap();

    assert_eq!(summary.events_read, 1000);
    assert_eq!(summary.windows_fired, 3);
    assert_eq!(summary.watermarks_emitted, 0);

    let body = tokio::fs::read_to_string(&output).await.unwrap();
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("count,first_event_time,last_event_time"));
    let counts: Vec<u64> = lines
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(counts, vec![400, 400, 200]);
}
