use ntex::http::StatusCode;
use ntex::web::{HttpResponse, WebResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing argument: {0}")]
    Args(String),
    #[error("unknown category: {0}")]
    Category(String),
    #[error("cannot encode entry: {0}")]
    Encode(String),
    #[error("no entry with timestamp {0}")]
    Timestamp(u32),
    #[error("unknown command: {0}")]
    Command(String),
    #[error("weeklog is {len} bytes long, not a whole number of records")]
    Corrupt { len: u64 },
    #[error("week configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Args(_) => "ERR_ARGS",
            AppError::Category(_) => "ERR_CATEGORY",
            AppError::Encode(_) => "ERR_ENCODE",
            AppError::Timestamp(_) => "ERR_TIMESTAMP",
            AppError::Command(_) => "ERR_COMMAND",
            AppError::Corrupt { .. } => "ERR_CORRUPT",
            AppError::Config(_) => "ERR_CONFIG",
            AppError::Io(_) => "ERR_IO",
        }
    }
}

impl WebResponseError for AppError {
    fn error_response(&self, _: &ntex::web::HttpRequest) -> HttpResponse {
        let status = match self {
            AppError::Args(_)
            | AppError::Category(_)
            | AppError::Encode(_)
            | AppError::Command(_) => StatusCode::BAD_REQUEST,
            AppError::Timestamp(_) => StatusCode::NOT_FOUND,
            AppError::Corrupt { .. } | AppError::Config(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        // io details stay in the server log
        let message = match self {
            AppError::Io(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(&serde_json::json!({
            "error": self.code(),
            "message": message,
        }))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Config(e.to_string())
    }
}
