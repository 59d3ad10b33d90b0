// Error types - configuration, worker and formatter failures

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::report::Capability;

/// Convenience alias used across the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Problems detected before any worker is spawned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown formatter '{0}' (available: {1})")]
    UnknownFormatter(String, String),

    #[error("invalid {flag} regex '{pattern}': {source}")]
    InvalidPattern {
        flag: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("group-by strategy '{0}' is not supported by this test engine")]
    UnsupportedGrouping(String),

    #[error("cannot read runtime log {path}: {source}")]
    RuntimeLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no test files found in {0:?}")]
    NoTestFiles(Vec<PathBuf>),

    #[error("worker command is empty")]
    EmptyWorkerCommand,
}

/// Fatal run errors. Test failures are never reported through this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("worker {worker} communication failure: {reason}")]
    WorkerCommunication { worker: usize, reason: String },

    #[error("example '{0}' was reported more than once")]
    DuplicateExample(String),

    #[error("formatter '{formatter}' failed in {hook}: {source}")]
    Render {
        formatter: String,
        hook: Capability,
        #[source]
        source: io::Error,
    },

    #[error("failed to write seed notice: {0}")]
    SeedNotice(#[source] io::Error),
}

impl Error {
    pub fn worker(worker: usize, reason: impl Into<String>) -> Self {
        Error::WorkerCommunication {
            worker,
            reason: reason.into(),
        }
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration",
            Error::WorkerCommunication { .. } => "worker_communication",
            Error::DuplicateExample(_) => "duplicate_example",
            Error::Render { .. } => "formatter_render",
            Error::SeedNotice(_) => "seed_notice",
        }
    }
}
