//! `POST /convert`: run one conversion within the request.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use driveconv_core::{ConversionRequest, ConversionResult};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    pub video_url: String,
    pub folder_url: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Error returned by the convert endpoint.
#[derive(Debug)]
pub enum ConvertError {
    /// The request body could not be turned into a conversion request.
    BadRequest(String),
    /// The pipeline ran and reported a failure.
    Failed(String),
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ConvertError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ConvertError::Failed(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<JsonRejection> for ConvertError {
    fn from(rejection: JsonRejection) -> Self {
        ConvertError::BadRequest(rejection.body_text())
    }
}

pub async fn convert(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConvertBody>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ConvertError> {
    let Json(body) = body.inspect_err(|e| debug!("Rejected convert body: {}", e))?;

    let request = ConversionRequest::new(&body.video_url, &body.folder_url)
        .map_err(|e| ConvertError::BadRequest(e.to_string()))?;

    // Detached so a client hanging up cannot abort the run before cleanup
    let result = state.orchestrator().spawn(request).await.unwrap_or_else(|e| {
        error!("Conversion task failed: {}", e);
        ConversionResult::failure(format!("Conversion task failed: {}", e))
    });
    if result.success {
        Ok(Json(ConvertResponse {
            status: "success",
            message: result.message,
        }))
    } else {
        warn!("Conversion request failed: {}", result.message);
        Err(ConvertError::Failed(result.message))
    }
}
