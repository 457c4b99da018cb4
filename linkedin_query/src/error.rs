use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a run before any query executes.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("LinkedIn export not found. Pass --export-dir or set LINKEDIN_EXPORT_DIR")]
    NotFound,
    #[error("no Connections.csv in {0}")]
    MissingConnections(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
