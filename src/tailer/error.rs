use std::path::PathBuf;
use thiserror::Error;

/// Session-level failures. Each one ends the session.
///
/// Lines that do not parse are not errors; they are skipped.
#[derive(Error, Debug)]
pub enum TailError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tailing task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, TailError>;
