use crate::error::{ErrorKind, RegistrationError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::any::Any;
use tracing::error;

pub const GENERIC_ERROR: &str = "Something went wrong!";

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
}

/// HTTP face of a [`RegistrationError`].
#[derive(Debug)]
pub struct ApiError(pub RegistrationError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation | ErrorKind::Verification => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Gateway => StatusCode::BAD_GATEWAY,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Persistence | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let kind = self.0.kind();
        let error = match kind {
            ErrorKind::Internal => GENERIC_ERROR.to_string(),
            _ => self.0.to_string(),
        };
        ErrorBody {
            success: false,
            error,
            kind,
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RegistrationError::ValidationError(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.kind() == ErrorKind::Internal {
            error!(error = %self.0, "unhandled error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

/// Last-resort handler for panics inside request handlers.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            success: false,
            error: GENERIC_ERROR.to_string(),
            kind: ErrorKind::Internal,
        }),
    )
        .into_response()
}
