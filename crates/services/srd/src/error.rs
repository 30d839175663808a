//! Daemon errors and their HTTP mapping.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] sr_config::error::Error),

    #[error(transparent)]
    Store(#[from] sr_store::error::Error),

    #[error(transparent)]
    Runner(#[from] sr_runner::error::Error),

    #[error("Storage directory not selected")]
    StorageNotSelected,

    #[error("Not found")]
    ScriptNotFound,
}

impl Error {
    fn status(&self) -> StatusCode {
        use sr_runner::error::Error as RunnerError;
        use sr_store::error::Error as StoreError;

        match self {
            Error::ScriptNotFound | Error::Store(StoreError::ScriptNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Error::StorageNotSelected | Error::Runner(RunnerError::StorageRootMissing) => {
                StatusCode::BAD_REQUEST
            }
            Error::Runner(RunnerError::InvalidScriptId(_)) => StatusCode::BAD_REQUEST,
            Error::Runner(RunnerError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            Error::Runner(RunnerError::RunnerClosed) => StatusCode::SERVICE_UNAVAILABLE,
            Error::IO(_)
            | Error::Config(_)
            | Error::Store(_)
            | Error::Runner(RunnerError::IO(_))
            | Error::Runner(RunnerError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {self:?}");
            String::from("Internal server error")
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16()
            }
        }));
        (status, body).into_response()
    }
}
