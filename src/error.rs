use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::{DatabaseType, ErrorResponse};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{}", driver_message(.0))]
    Driver(#[from] sqlx::Error),

    #[error("Connection timed out after {}s", .0.as_secs())]
    ConnectTimeout(Duration),

    #[error("Unsupported database type: {0}")]
    UnsupportedDialect(DatabaseType),

    #[error("Database name is required to fetch schemas")]
    MissingDatabase,

    #[error("{0}")]
    InvalidRequest(String),
}

/// Prefer the server's own message text for errors the database reported.
fn driver_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Attach an elapsed time, as `execute-query` failures report one.
    pub fn timed(self, execution_time: String) -> TimedError {
        TimedError {
            error: self,
            execution_time,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            execution_time: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug)]
pub struct TimedError {
    pub error: GatewayError,
    pub execution_time: String,
}

impl IntoResponse for TimedError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.error.to_string(),
            execution_time: Some(self.execution_time),
        };
        (self.error.status(), Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
