//! Script store error types.

/// Script store errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Script {0} not found")]
    ScriptNotFound(String),
}
