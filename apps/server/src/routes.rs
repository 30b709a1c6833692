//! HTTP route handlers for the video analysis API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dynamo_core::{ConceptEntry, DynamoError, RetrievalError};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/analyze_video", post(analyze_video))
        .with_state(state)
}

async fn read_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the Video Analysis API!"
    }))
}

#[derive(Debug, Deserialize)]
pub struct VideoAnalysisRequest {
    pub youtube_link: String,
    /// Number of groups; the server default applies when absent.
    #[serde(default)]
    pub group_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct VideoAnalysisResponse {
    pub key_concepts: Vec<ConceptEntry>,
}

/// Error body shaped as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

impl From<DynamoError> for ApiError {
    fn from(err: DynamoError) -> Self {
        let status = match &err {
            DynamoError::InvalidGroupSize { .. } | DynamoError::GroupTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            DynamoError::Retrieval(e) if e.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            DynamoError::Retrieval(_) | DynamoError::Backend { .. } => StatusCode::BAD_GATEWAY,
            DynamoError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            DynamoError::IoError(_) | DynamoError::JsonError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Video analysis failed");
        } else {
            tracing::info!(error = %err, "Rejected video analysis request");
        }
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::info!(error = %rejection.body_text(), "Rejected malformed request body");
        Self::unprocessable(rejection.body_text())
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        DynamoError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

fn validate_link(link: &str) -> Result<(), ApiError> {
    let url = Url::parse(link)
        .map_err(|e| ApiError::unprocessable(format!("youtube_link is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ApiError::unprocessable(
            "youtube_link must be an http(s) URL",
        ));
    }
    Ok(())
}

async fn analyze_video(
    State(state): State<Arc<AppState>>,
    request: Result<Json<VideoAnalysisRequest>, JsonRejection>,
) -> Result<Json<VideoAnalysisResponse>, ApiError> {
    let Json(request) = request?;
    validate_link(&request.youtube_link)?;

    let request_id = Uuid::new_v4();
    let group_size = request.group_size.unwrap_or(state.default_group_size);
    let span = tracing::info_span!("analyze_video", %request_id, link = %request.youtube_link, group_size);

    async move {
        let cancel = state.shutdown.child_token();
        let chunks = state.retriever.retrieve(&request.youtube_link).await?;
        let extraction = state
            .extractor
            .find_key_concepts(&chunks, group_size, &cancel)
            .await?;

        tracing::info!(
            concepts = extraction.concepts.len(),
            failed_groups = extraction.failed_groups().count(),
            cost = extraction.cost.total(),
            "Video analysed"
        );

        Ok::<_, ApiError>(Json(VideoAnalysisResponse {
            key_concepts: extraction.concepts,
        }))
    }
    .instrument(span)
    .await
}
