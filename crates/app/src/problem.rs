use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// JSON error payload of the form `{"error": "..."}` paired with a status code.
pub struct ProblemResponse {
    status: StatusCode,
    body: ErrorBody,
}

impl ProblemResponse {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
            },
        }
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
