use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing the tools dataset.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("dataset has no header row")]
    EmptyData,
    #[error("failed to write dataset {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
