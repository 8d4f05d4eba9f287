//! Unrecoverable startup errors

use thiserror::Error;

use crate::domain::filter::FilterError;

/// Errors that stop the process before (or while) serving requests.
///
/// Nothing in resolution or compilation exits the process directly; `main`
/// maps these to a non-zero exit status.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Invalid command line, or an explicit `--help` / `--version` request
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("Invalid startup jq filter: {0}")]
    Filter(#[source] FilterError),

    #[error("Failed to initialize tracer: {0}")]
    Tracer(String),

    #[error("Invalid endpoint path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
