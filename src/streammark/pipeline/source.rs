//! Event Sources
//!
//! An [`EventSource`] hands the runner events in batches; an empty batch
//! signals end of stream. Every experiment in a sweep opens its own source,
//! so the same input file is re-read from the start for each run.
//!
//! [`FileEventSource`] reads the CSV input format, one event per line:
//!
//! ```text
//! key,timestamp,value
//! sensor-1,1000,20.5
//! ```
//!
//! with epoch-millisecond timestamps. Blank lines and lines starting with
//! `#` are skipped.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::streammark::error::{PipelineError, PipelineResult};
use crate::streammark::model::Event;

/// Events accumulated per `read` call.
pub(crate) const READ_BATCH_SIZE: usize = 100;

/// Batch producer of events for one pipeline run.
#[async_trait]
pub trait EventSource: Send {
    /// Read the next batch. An empty batch means the source is exhausted.
    ///
    /// Implementations must be cancel safe: the runner may drop an
    /// in-flight `read` when a watermark timer fires, and events already
    /// consumed from the underlying medium must survive into the next
    /// call.
    async fn read(&mut self) -> PipelineResult<Vec<Event>>;
}

/// Parse one non-blank, non-comment CSV line.
fn parse_event_line(line: &str) -> Result<Event, String> {
    let mut parts = line.splitn(3, ',');
    let key = parts.next().map(str::trim).unwrap_or_default();
    let timestamp = parts.next().map(str::trim);
    let value = parts.next().map(str::trim);

    if key.is_empty() {
        return Err("empty key".to_string());
    }
    let (Some(timestamp), Some(value)) = (timestamp, value) else {
        return Err("expected 'key,timestamp,value'".to_string());
    };
    let timestamp = timestamp
        .parse::<i64>()
        .map_err(|e| format!("invalid timestamp '{}': {}", timestamp, e))?;
    let value = value
        .parse::<f64>()
        .map_err(|e| format!("invalid value '{}': {}", value, e))?;
    Ok(Event::new(key, timestamp, value))
}

/// CSV file source. Malformed lines fail the run with the offending path
/// and line number.
#[derive(Debug)]
pub struct FileEventSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
    /// Events parsed but not yet handed out; survives a cancelled `read`.
    pending: Vec<Event>,
    exhausted: bool,
}

impl FileEventSource {
    pub async fn open(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|e| PipelineError::source(path.display().to_string(), e.to_string()))?;
        Ok(FileEventSource {
            lines: BufReader::new(file).lines(),
            path,
            line_number: 0,
            pending: Vec::with_capacity(READ_BATCH_SIZE),
            exhausted: false,
        })
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn read(&mut self) -> PipelineResult<Vec<Event>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        loop {
            if self.pending.len() >= READ_BATCH_SIZE {
                return Ok(std::mem::take(&mut self.pending));
            }
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    self.line_number += 1;
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    match parse_event_line(line) {
                        Ok(event) => self.pending.push(event),
                        Err(message) => {
                            return Err(PipelineError::malformed_event(
                                self.path.display().to_string(),
                                self.line_number,
                                message,
                            ))
                        }
                    }
                }
                Ok(None) => {
                    self.exhausted = true;
                    return Ok(std::mem::take(&mut self.pending));
                }
                Err(e) => {
                    return Err(PipelineError::source(
                        self.path.display().to_string(),
                        e.to_string(),
                    ))
                }
            }
        }
    }
}

/// In-memory source for tests and synthetic runs.
pub struct MemoryEventSource {
    events: VecDeque<Event>,
}

impl MemoryEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        MemoryEventSource {
            events: events.into(),
        }
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn read(&mut self) -> PipelineResult<Vec<Event>> {
        let n = self.events.len().min(READ_BATCH_SIZE);
        Ok(self.events.drain(..n).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(source: &mut dyn EventSource) -> PipelineResult<Vec<Event>> {
        let mut all = Vec::new();
        loop {
            let batch = source.read().await?;
            if batch.is_empty() {
                return Ok(all);
            }
            all.extend(batch);
        }
    }

    #[test]
    fn test_parse_valid_line() {
        let event = parse_event_line("sensor-1,1000,20.5").unwrap();
        assert_eq!(event.key, "sensor-1");
        assert_eq!(event.timestamp, 1000);
        assert_eq!(event.value, 20.5);
    }

    #[test]
    fn test_parse_tolerates_field_whitespace() {
        let event = parse_event_line("a , -250 , 1").unwrap();
        assert_eq!(event.key, "a");
        assert_eq!(event.timestamp, -250);
        assert_eq!(event.value, 1.0);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(parse_event_line("a,1000").is_err());
        assert!(parse_event_line(",1000,1.0").is_err());
        assert!(parse_event_line("a,ten,1.0").is_err());
        assert!(parse_event_line("a,1000,much").is_err());
    }

    #[tokio::test]
    async fn test_file_source_reads_all_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(
            &path,
            "# synthetic input\n\na,0,1.0\na,50,1.5\nb,120,2.0\n",
        )
        .unwrap();

        let mut source = FileEventSource::open(&path).await.unwrap();
        let events = drain(&mut source).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Event::new("a", 0, 1.0));
        assert_eq!(events[2], Event::new("b", 120, 2.0));

        // Exhausted source keeps reporting end of stream.
        assert!(source.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_source_reports_malformed_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "a,0,1.0\na,oops,1.0\n").unwrap();

        let mut source = FileEventSource::open(&path).await.unwrap();
        let err = drain(&mut source).await.unwrap_err();
        match err {
            PipelineError::MalformedEvent { line, .. } => assert_eq!(line, 2),
            other => panic!("expected MalformedEvent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_a_source_error() {
        let err = FileEventSource::open("/nonexistent/events.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Source { .. }));
    }

    #[tokio::test]
    async fn test_file_source_batches_large_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let mut body = String::new();
        for i in 0..(READ_BATCH_SIZE * 2 + 7) {
            body.push_str(&format!("k,{},1.0\n", i));
        }
        std::fs::write(&path, body).unwrap();

        let mut source = FileEventSource::open(&path).await.unwrap();
        let first = source.read().await.unwrap();
        assert_eq!(first.len(), READ_BATCH_SIZE);
        let events = drain(&mut source).await.unwrap();
        assert_eq!(events.len(), READ_BATCH_SIZE + 7);
    }

    #[tokio::test]
    async fn test_memory_source_drains_in_order() {
        let mut source = MemoryEventSource::new(vec![
            Event::new("a", 1, 0.0),
            Event::new("a", 2, 0.0),
        ]);
        let events = drain(&mut source).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, 1);
    }
}
