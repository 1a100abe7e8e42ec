//! Result Sinks
//!
//! A [`ResultSink`] receives fired window rows (or count-batch rows on the
//! diagnostic path) and finalizes the output when the run completes.
//!
//! The file sink writes through a temp file and renames it into place on
//! [`ResultSink::finish`]. The output file name is the sweep's idempotence
//! key, so a crashed or failed run must never leave a file at the final
//! path; until the rename happens there is nothing the skip-check could
//! mistake for a completed result.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::streammark::error::{PipelineError, PipelineResult};
use crate::streammark::model::WindowResult;
use crate::streammark::window::CountWindowSummary;

/// Consumer of pipeline output rows.
#[async_trait]
pub trait ResultSink: Send {
    /// Append fired window rows.
    async fn write_results(&mut self, results: &[WindowResult]) -> PipelineResult<()>;

    /// Append count-batch rows from the diagnostic discipline.
    async fn write_counts(&mut self, summaries: &[CountWindowSummary]) -> PipelineResult<()>;

    /// Flush and finalize the output. No writes may follow.
    async fn finish(&mut self) -> PipelineResult<()>;
}

/// Buffered writer that only materializes the final path on `finish`.
struct AtomicFileWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    /// `None` once finished; the temp file is cleaned up on drop otherwise.
    writer: Option<BufWriter<File>>,
}

impl AtomicFileWriter {
    async fn create(path: &Path) -> PipelineResult<Self> {
        let mut temp = path.as_os_str().to_os_string();
        temp.push(".tmp");
        let temp_path = PathBuf::from(temp);
        let file = File::create(&temp_path)
            .await
            .map_err(|e| PipelineError::sink(path.display().to_string(), e.to_string()))?;
        Ok(AtomicFileWriter {
            final_path: path.to_path_buf(),
            temp_path,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn error(&self, message: impl ToString) -> PipelineError {
        PipelineError::sink(self.final_path.display().to_string(), message.to_string())
    }

    async fn write_line(&mut self, line: &str) -> PipelineResult<()> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Err(self.error("write after finish")),
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            return Err(self.error(e));
        }
        if let Err(e) = writer.write_all(b"\n").await {
            return Err(self.error(e));
        }
        Ok(())
    }

    async fn finish(&mut self) -> PipelineResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        if let Err(e) = writer.flush().await {
            return Err(self.error(e));
        }
        let file = writer.into_inner();
        if let Err(e) = file.sync_all().await {
            return Err(self.error(e));
        }
        drop(file);
        tokio::fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| self.error(e))
    }
}

impl Drop for AtomicFileWriter {
    fn drop(&mut self) {
        if self.writer.is_some() {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

/// CSV file sink with atomic completion semantics.
pub struct FileResultSink {
    writer: AtomicFileWriter,
    header_written: bool,
}

impl FileResultSink {
    pub async fn create(path: impl AsRef<Path>) -> PipelineResult<Self> {
        Ok(FileResultSink {
            writer: AtomicFileWriter::create(path.as_ref()).await?,
            header_written: false,
        })
    }

    async fn header(&mut self, header: &str) -> PipelineResult<()> {
        if !self.header_written {
            self.writer.write_line(header).await?;
            self.header_written = true;
        }
        Ok(())
    }
}

#[async_trait]
impl ResultSink for FileResultSink {
    async fn write_results(&mut self, results: &[WindowResult]) -> PipelineResult<()> {
        self.header(WindowResult::CSV_HEADER).await?;
        for result in results {
            self.writer.write_line(&result.to_csv_row()).await?;
        }
        Ok(())
    }

    async fn write_counts(&mut self, summaries: &[CountWindowSummary]) -> PipelineResult<()> {
        self.header(CountWindowSummary::CSV_HEADER).await?;
        for summary in summaries {
            self.writer.write_line(&summary.to_csv_row()).await?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> PipelineResult<()> {
        // A run that fired nothing still produces a well-formed file.
        self.header(WindowResult::CSV_HEADER).await?;
        self.writer.finish().await
    }
}

/// Collecting sink for tests.
#[derive(Debug, Default)]
pub struct MemoryResultSink {
    results: Vec<WindowResult>,
    counts: Vec<CountWindowSummary>,
    finished: bool,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        MemoryResultSink::default()
    }

    pub fn results(&self) -> &[WindowResult] {
        &self.results
    }

    pub fn counts(&self) -> &[CountWindowSummary] {
        &self.counts
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[async_trait]
impl ResultSink for MemoryResultSink {
    async fn write_results(&mut self, results: &[WindowResult]) -> PipelineResult<()> {
        self.results.extend_from_slice(results);
        Ok(())
    }

    async fn write_counts(&mut self, summaries: &[CountWindowSummary]) -> PipelineResult<()> {
        self.counts.extend_from_slice(summaries);
        Ok(())
    }

    async fn finish(&mut self) -> PipelineResult<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streammark::model::Window;

    fn result(key: &str, start: i64, end: i64, count: u64, lag: i64) -> WindowResult {
        WindowResult {
            window: Window {
                key: key.to_string(),
                start,
                end,
            },
            count,
            lag,
        }
    }

    #[tokio::test]
    async fn test_final_path_appears_only_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut sink = FileResultSink::create(&path).await.unwrap();
        sink.write_results(&[result("a", 0, 100, 2, 50)])
            .await
            .unwrap();

        assert!(!path.exists());
        assert!(dir.path().join("out.txt.tmp").exists());

        sink.finish().await.unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("out.txt.tmp").exists());

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "key,window_start,window_end,count,lag\na,0,100,2,50\n");
    }

    #[tokio::test]
    async fn test_abandoned_sink_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut sink = FileResultSink::create(&path).await.unwrap();
        sink.write_results(&[result("a", 0, 100, 1, 0)])
            .await
            .unwrap();
        drop(sink);

        assert!(!path.exists());
        assert!(!dir.path().join("out.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_empty_run_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut sink = FileResultSink::create(&path).await.unwrap();
        sink.finish().await.unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "key,window_start,window_end,count,lag\n");
    }

    #[tokio::test]
    async fn test_finish_is_idempotent_and_blocks_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut sink = FileResultSink::create(&path).await.unwrap();
        sink.finish().await.unwrap();
        sink.finish().await.unwrap();

        let err = sink
            .write_results(&[result("a", 0, 100, 1, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Sink { .. }));
    }

    #[tokio::test]
    async fn test_count_rows_use_count_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.txt");

        let mut sink = FileResultSink::create(&path).await.unwrap();
        sink.write_counts(&[CountWindowSummary {
            first_timestamp: 0,
            last_timestamp: 1500,
            count: 2,
        }])
        .await
        .unwrap();
        sink.finish().await.unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some(CountWindowSummary::CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("2,1970-01-01 00:00:00.000,1970-01-01 00:00:01.500")
        );
    }

    #[tokio::test]
    async fn test_memory_sink_collects_rows() {
        let mut sink = MemoryResultSink::new();
        sink.write_results(&[result("a", 0, 100, 1, 0)])
            .await
            .unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.results().len(), 1);
        assert!(sink.is_finished());
    }
}
