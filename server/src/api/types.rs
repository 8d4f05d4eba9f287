//! Shared API types
//!
//! Error envelope and JSON response encoding for the filter endpoint.

use axum::body::Body;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::filter::FilterError;
use crate::utils::json;

/// Error body: `{"status":"error","message":...}`
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: &'static str,
    pub message: &'a str,
}

/// Standard API error response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest { message: String },
    PayloadTooLarge { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message }
            | Self::PayloadTooLarge { message }
            | Self::Internal { message } => message,
        }
    }

    /// Render the error envelope, HTML-escaping it when requested
    pub fn into_response_with(self, escape_html: bool) -> Response {
        json_response(
            self.status(),
            &ErrorBody {
                status: "error",
                message: self.message(),
            },
            escape_html,
        )
    }
}

/// Every engine failure is the client's filter or document at fault
impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::bad_request(e.to_string())
    }
}

/// The body limit answers 413, any other read failure 400
impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge { message }
        } else {
            Self::bad_request(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

/// Encode `value` as a JSON response with the given status
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
    escape_html: bool,
) -> Response {
    match json::to_vec(value, escape_html) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode JSON response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
