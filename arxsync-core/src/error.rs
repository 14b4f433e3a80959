use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Integrity check failed for {0}")]
    Integrity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Failures raised while walking and copying input paths.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list directory {}: {source}", .path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("copying {} into archive entry {name} failed: {source}", .path.display())]
    Copy {
        path: PathBuf,
        name: String,
        #[source]
        source: Box<ArxError>,
    },

    #[error("{} is outside the import prefix {}", .path.display(), .prefix.display())]
    OutsidePrefix { path: PathBuf, prefix: PathBuf },

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("cannot spawn import thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("import drain thread panicked")]
    DrainPanicked,
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, ArxError>;
