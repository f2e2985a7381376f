//! Error types for reading song sources.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal failure to obtain song markup. No partial song is produced.
#[derive(Debug, Error)]
pub enum SongError {
    #[error("song source not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read song source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("song source is not valid UTF-8: {0}")]
    Encoding(#[from] core::str::Utf8Error),
}

impl SongError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}
