//! Error types for srcli.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] sr_config::error::Error),

    #[error(transparent)]
    Runner(#[from] sr_runner::error::Error),

    #[error("{0} has no file name")]
    NoFileName(std::path::PathBuf),
}
