pub mod admin;
pub mod link_card;
pub mod session;
pub mod trust;
pub mod ws_ticket;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::{AppError, AppResult};

/// Unwrap a JSON body, answering 400 `bad json` for anything axum rejects
/// (missing content type, syntax errors, wrong field types).
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            Err(AppError::BadRequest("bad json".into()))
        }
    }
}
