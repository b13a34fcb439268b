//! Error taxonomy and HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy surfaced to HTTP clients.
///
/// `trace_id` is attached by the caller (the handler or the catching
/// middleware has the request's `Trace-Id` in scope; the error type itself
/// does not) via [`Error::into_response_with_trace_id`], so a JSON body
/// can echo it back to the client.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    BadConfig(String),

    /// Broker connect/publish/subscribe failure.
    #[error("broker error: {0}")]
    Bus(String),

    /// Route is not public and no valid bearer token was presented.
    #[error("authentication required")]
    Unauthenticated,

    /// Resource or action is not permitted for the microservice.
    #[error("forbidden: {0}")]
    Unauthorized(String),

    /// Unknown resource, action, or other internal lookup miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// The in-flight call was cancelled (client disconnect, or explicit
    /// cancellation token firing).
    #[error("cancelled")]
    Cancelled,

    /// An RPC exceeded its deadline.
    #[error("upstream timeout")]
    UpstreamTimeout,

    /// Anything else.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// The three body shapes a non-2xx response can take. Most of the taxonomy
/// is a normalized JSON error envelope, but `Unauthenticated`/`Cancelled`
/// carry no body at all, and `Unauthorized`/`BadConfig` are plain text —
/// callers at those two layers are expected to already know what went
/// wrong from the message alone.
enum ErrorBody {
    Empty,
    Text(String),
    Json(ErrorResponse),
}

impl Error {
    /// Attach a trace id to the error body, if this variant carries one.
    /// Prefer this over `into_response()` directly whenever the request's
    /// `Trace-Id` is available to the caller.
    pub fn into_response_with_trace_id(self, trace_id: impl Into<String>) -> Response {
        self.into_response_with_trace_id_env(trace_id, false)
    }

    /// As [`Error::into_response_with_trace_id`], additionally stripping the
    /// `exception` field from the JSON body when `is_production` is true.
    pub fn into_response_with_trace_id_env(
        self,
        trace_id: impl Into<String>,
        is_production: bool,
    ) -> Response {
        let (status, body) = self.to_status_and_body();
        match body {
            ErrorBody::Empty => status.into_response(),
            ErrorBody::Text(msg) => (status, msg).into_response(),
            ErrorBody::Json(mut body) => {
                body.trace_id = Some(trace_id.into());
                let body = body.redact_in_production(is_production);
                (status, Json(body)).into_response()
            }
        }
    }

    fn to_status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            Error::BadConfig(msg) => (StatusCode::BAD_REQUEST, ErrorBody::Text(msg.clone())),
            Error::Bus(msg) => {
                tracing::error!("broker error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::Json(ErrorResponse::new("BUS_ERROR", "broker operation failed")),
                )
            }
            Error::Unauthenticated => (StatusCode::UNAUTHORIZED, ErrorBody::Empty),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::Text(msg.clone())),
            Error::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody::Json(ErrorResponse::new("NOT_FOUND", msg.clone())),
            ),
            Error::Cancelled => {
                // The client has already disconnected in the overwhelming
                // majority of cases; this status is reachable only when a
                // non-HTTP-driven cancellation fires (e.g. a test harness).
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::Empty)
            }
            Error::UpstreamTimeout => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::Json(ErrorResponse::new(
                    "UPSTREAM_TIMEOUT",
                    "upstream did not respond in time",
                )),
            ),
            Error::Unexpected(msg) => {
                tracing::error!("unexpected error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::Json(
                        ErrorResponse::new("UNEXPECTED", "an unexpected error occurred")
                            .with_exception(msg.clone()),
                    ),
                )
            }
        }
    }
}

/// The `{code, message, traceId, exception?}` body shape shared by every
/// non-2xx response the top-level error handling produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,

    #[serde(rename = "traceId", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Populated only outside the `production` environment; stripped by
    /// [`ErrorResponse::redact_in_production`] at the response boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            trace_id: None,
            exception: None,
        }
    }

    fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Drop the `exception` field when running in `production`.
    pub fn redact_in_production(mut self, is_production: bool) -> Self {
        if is_production {
            self.exception = None;
        }
        self
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = self.to_status_and_body();
        match body {
            ErrorBody::Empty => status.into_response(),
            ErrorBody::Text(msg) => (status, msg).into_response(),
            ErrorBody::Json(body) => (status, Json(body)).into_response(),
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::BadConfig(err.to_string())
    }
}

impl From<axum::http::Error> for Error {
    fn from(err: axum::http::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Unexpected(format!("http client error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Unauthorized(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Unexpected(format!("io error: {err}"))
    }
}
