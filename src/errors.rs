use std::io;

use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Config(String),
}

/// Which side of the inbound contract an error is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    Client,
    Server,
}

impl AppError {
    pub fn fault(&self) -> Fault {
        match self {
            AppError::Validation(_) => Fault::Client,
            _ => Fault::Server,
        }
    }
}

/// Error body returned to callers in place of `{ data: [...] }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub fault: Fault,
    pub error: String,
}

impl From<&AppError> for ErrorPayload {
    fn from(err: &AppError) -> Self {
        let error = match err.fault() {
            Fault::Client => err.to_string(),
            // Internal detail stays in the logs; callers get a generic failure.
            Fault::Server => "failed to build destination result".to_string(),
        };
        Self {
            fault: err.fault(),
            error,
        }
    }
}
