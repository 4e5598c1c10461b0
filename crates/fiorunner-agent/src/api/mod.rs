//! Job submission API.
//!
//! `ApiError` is the single place where `FioRunnerError` becomes an HTTP
//! response; handlers return `Result<_, ApiError>` and use `?`.

pub mod job;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use fiorunner_core::error::{ClientCode, FioRunnerError};

#[derive(Debug)]
pub struct ApiError(pub FioRunnerError);

impl From<FioRunnerError> for ApiError {
    fn from(e: FioRunnerError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest | ClientCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ClientCode::Conflict => StatusCode::CONFLICT,
            ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.client_code();

        let mut error = json!({
            "code": code.as_str(),
            "message": self.0.to_string(),
        });
        if let FioRunnerError::Validation { diagnostics } = &self.0 {
            error["diagnostics"] = json!(diagnostics);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
