//! Run manager error types.
//!
//! Only precondition failures are errors. Everything that goes wrong with the
//! child process itself is reported through [`crate::RunResult`].

/// Run manager errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// No storage root is configured, so there is nowhere to write run logs.
    #[error("Storage directory not selected")]
    StorageRootMissing,

    /// A run for this script id is already queued or running.
    #[error("Script {0} is already running")]
    AlreadyRunning(String),

    /// The script id cannot be used as a log file name.
    #[error("Invalid script id {0:?}")]
    InvalidScriptId(String),

    /// The background task driving a run panicked or was cancelled.
    #[error(transparent)]
    Task(#[from] tokio::task::JoinError),

    /// The concurrency limiter was shut down.
    #[error("Run manager is shutting down")]
    RunnerClosed,
}
