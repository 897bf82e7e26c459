//! The uniform response envelope: `{statusCode, data, message, success}`.

use crate::engagement::EngagementError;
use crate::server::metrics::record_error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

pub struct ApiSuccess<T: Serialize> {
    status: StatusCode,
    data: T,
    message: String,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn ok<M: Into<String>>(data: T, message: M) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            message: message.into(),
        }
    }

    pub fn created<M: Into<String>>(data: T, message: M) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            message: message.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let body = json!({
            "statusCode": self.status.as_u16(),
            "data": self.data,
            "message": self.message,
            "success": true,
        });
        (self.status, Json(body)).into_response()
    }
}

pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    pub fn new<M: Into<String>>(status: StatusCode, message: M) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "statusCode": self.status.as_u16(),
            "data": serde_json::Value::Null,
            "message": self.message,
            "success": false,
        });
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for EngagementError {
    fn into_response(self) -> Response {
        let failure = match self {
            EngagementError::Validation(message) => {
                record_error("validation");
                ApiFailure::new(StatusCode::BAD_REQUEST, message)
            }
            EngagementError::NotFound(message) => {
                record_error("not_found");
                ApiFailure::new(StatusCode::NOT_FOUND, message)
            }
            EngagementError::Forbidden(message) => {
                record_error("forbidden");
                ApiFailure::new(StatusCode::FORBIDDEN, message)
            }
            EngagementError::Conflict(message) => {
                record_error("conflict");
                ApiFailure::new(StatusCode::CONFLICT, message)
            }
            EngagementError::Storage(err) => {
                record_error("internal");
                // Never leak internal detail to the caller.
                error!("internal error: {:#}", err);
                ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error.")
            }
        };
        failure.into_response()
    }
}
