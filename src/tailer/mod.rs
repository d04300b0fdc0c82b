//! Live tailing of a growing Client.txt
//!
//! A session opens the file, starts at its current end and polls the
//! length. New bytes are read, split into `\r\n` lines and parsed; every
//! recognized line is sent to the consumer in file order.

mod cursor;
mod error;

pub use cursor::{Growth, TailCursor, RECORD_SEPARATOR};
pub use error::{Result, TailError};

use crate::config::TailConfig;
use crate::event::LogEvent;
use crate::parser::parse_line;
use serde::Serialize;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TailStats {
    pub bytes_read: u64,
    pub lines_seen: u64,
    pub lines_unrecognized: u64,
    pub events_emitted: u64,
    /// Bytes of over-long unterminated lines that were discarded
    pub bytes_dropped: u64,
}

/// One tailing session over one file.
///
/// Owns the file handle; dropping the tailer (on any exit path) closes it.
pub struct LogTailer {
    path: PathBuf,
    file: File,
    cursor: TailCursor,
    config: TailConfig,
    stats: TailStats,
}

impl LogTailer {
    /// Open `path` for reading and position the cursor at its current end.
    ///
    /// Existing content is not replayed. Writers keep appending through
    /// their own handles.
    pub async fn open(path: impl Into<PathBuf>, config: TailConfig) -> Result<Self> {
        let path = path.into();
        let open_error = |source| TailError::Open {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).await.map_err(open_error)?;
        let metadata = file.metadata().await.map_err(open_error)?;
        if !metadata.is_file() {
            return Err(open_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let offset = metadata.len();
        info!(path = %path.display(), offset, "Tailing started");

        Ok(Self {
            path,
            file,
            cursor: TailCursor::with_line_limit(offset, config.line_limit()),
            config,
            stats: TailStats::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current byte offset
    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    /// Poll the file until `cancel` fires, the receiver goes away, or a read
    /// fails.
    pub async fn run(
        mut self,
        events: mpsc::Sender<LogEvent>,
        cancel: CancellationToken,
    ) -> Result<TailStats> {
        let result = self.poll_loop(&events, &cancel).await;

        match &result {
            Ok(()) => info!(
                path = %self.path.display(),
                offset = self.cursor.offset(),
                events = self.stats.events_emitted,
                unrecognized = self.stats.lines_unrecognized,
                dropped = self.stats.bytes_dropped,
                "Tailing stopped"
            ),
            Err(e) => error!(path = %self.path.display(), error = %e, "Tailing failed"),
        }

        result.map(|()| self.stats)
    }

    /// Run the session on its own task
    pub fn spawn(self, cancel: &CancellationToken) -> EventStream {
        let (tx, rx) = mpsc::channel(self.config.event_buffer());
        let cancel = cancel.child_token();
        let task = tokio::spawn(self.run(tx, cancel.clone()));

        EventStream {
            events: rx,
            task,
            cancel,
        }
    }

    async fn poll_loop(
        &mut self,
        events: &mpsc::Sender<LogEvent>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let interval = self.config.poll_interval();

        while !cancel.is_cancelled() {
            let metadata = self.file.metadata().await;
            let len = metadata.map_err(|source| self.read_error(source))?.len();

            match self.cursor.observe(len) {
                Growth::Unchanged => {
                    if !pause(interval, cancel).await {
                        break;
                    }
                }
                Growth::Shrunk { from, to } => {
                    warn!(
                        path = %self.path.display(),
                        previous_offset = from,
                        current_size = to,
                        "File shrank; resuming from its current end"
                    );
                    self.cursor.reset(to);
                }
                Growth::Grown(available) => {
                    let Some(lines) = self.read_growth(available).await? else {
                        // length raced ahead of the readable content
                        if !pause(interval, cancel).await {
                            break;
                        }
                        continue;
                    };
                    for line in lines {
                        if !self.dispatch(&line, events, cancel).await {
                            return Ok(());
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Read up to `available` new bytes at the cursor and return the lines
    /// they complete, or `None` if nothing could be read
    async fn read_growth(&mut self, available: u64) -> Result<Option<Vec<String>>> {
        let want = available.min(self.config.read_limit());
        let offset = self.cursor.offset();

        let seek = self.file.seek(SeekFrom::Start(offset)).await;
        seek.map_err(|source| self.read_error(source))?;

        let mut buf = Vec::with_capacity(want as usize);
        let read = (&mut self.file).take(want).read_to_end(&mut buf).await;
        read.map_err(|source| self.read_error(source))?;

        if buf.is_empty() {
            return Ok(None);
        }

        self.stats.bytes_read += buf.len() as u64;
        let lines = self.cursor.feed(&buf);

        let dropped = self.cursor.dropped_bytes() - self.stats.bytes_dropped;
        if dropped > 0 {
            warn!(
                path = %self.path.display(),
                offset,
                dropped,
                limit = self.config.line_limit(),
                "Line exceeded the length limit; fragment dropped"
            );
            self.stats.bytes_dropped = self.cursor.dropped_bytes();
        }
        debug!(
            offset,
            bytes = buf.len(),
            lines = lines.len(),
            pending = self.cursor.pending().len(),
            "Read new bytes"
        );
        Ok(Some(lines))
    }

    /// Parse one line and forward it. Returns false once the session should
    /// stop.
    async fn dispatch(
        &mut self,
        line: &str,
        events: &mpsc::Sender<LogEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        self.stats.lines_seen += 1;

        let Some(event) = parse_line(line) else {
            self.stats.lines_unrecognized += 1;
            trace!(line = %line, "Unrecognized line");
            return true;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = events.send(event) => {
                if sent.is_err() {
                    debug!("Event receiver dropped");
                    return false;
                }
                self.stats.events_emitted += 1;
                true
            }
        }
    }

    fn read_error(&self, source: std::io::Error) -> TailError {
        TailError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

/// Sleep for one polling interval. Returns false if cancelled first.
async fn pause(interval: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(interval) => true,
    }
}

/// Events from a spawned session.
///
/// Dropping the stream cancels the session.
pub struct EventStream {
    events: mpsc::Receiver<LogEvent>,
    task: JoinHandle<Result<TailStats>>,
    cancel: CancellationToken,
}

impl EventStream {
    /// Next event, or `None` once the session has ended and every event has
    /// been received
    pub async fn next(&mut self) -> Option<LogEvent> {
        self.events.recv().await
    }

    /// Ask the session to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the session and wait for it, returning its counters or the
    /// error that ended it
    pub async fn finish(mut self) -> Result<TailStats> {
        self.cancel.cancel();
        (&mut self.task).await?
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Open `path` and tail it on a background task.
///
/// Open failures are returned here, before any event.
pub async fn watch(
    path: impl Into<PathBuf>,
    config: TailConfig,
    cancel: &CancellationToken,
) -> Result<EventStream> {
    let tailer = LogTailer::open(path, config).await?;
    Ok(tailer.spawn(cancel))
}
