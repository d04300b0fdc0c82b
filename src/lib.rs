//! PoE Log Watcher - tail Client.txt and turn new lines into typed events

pub mod config;
pub mod event;
pub mod parser;
pub mod tailer;

pub use config::TailConfig;
pub use event::{ChatChannel, LogEvent, WhisperDirection};
pub use parser::{parse_file, parse_line, parse_reader, parse_timestamp};
pub use tailer::{watch, EventStream, Growth, LogTailer, TailCursor, TailError, TailStats};

// Re-exported so callers can build the cancellation signal without a direct dependency
pub use tokio_util::sync::CancellationToken;
