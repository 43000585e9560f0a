use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::blocking;
use crate::error::{ApiError, AppError};
use crate::models::session::{ArtifactContent, SessionSummary, TranscriptResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route(
            "/api/sessions/{*path}",
            get(read_artifact).delete(delete_artifact),
        )
        .route("/api/transcripts/{*path}", get(read_transcript))
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    responses(
        (status = 200, description = "Archived sessions, most recent first", body = Vec<SessionSummary>),
    ),
    tag = "Archive"
)]
pub(crate) async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let catalog = state.catalog.clone();
    let sessions = blocking(move || catalog.list_sessions()).await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{path}",
    params(("path" = String, Path, description = "`<session>/<file>` as returned by the listing")),
    responses(
        (status = 200, description = "Raw transcript", body = ArtifactContent),
        (status = 400, description = "Path escapes the archive root", body = ApiError),
        (status = 404, description = "Not found", body = ApiError),
    ),
    tag = "Archive"
)]
pub(crate) async fn read_artifact(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<ArtifactContent>, AppError> {
    let catalog = state.catalog.clone();
    let artifact = blocking(move || catalog.read_artifact(&path)).await?;
    Ok(Json(artifact))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{path}",
    params(("path" = String, Path, description = "A transcript, or a whole session directory")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Path escapes the archive root", body = ApiError),
        (status = 404, description = "Not found", body = ApiError),
    ),
    tag = "Archive"
)]
pub(crate) async fn delete_artifact(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, AppError> {
    let catalog = state.catalog.clone();
    blocking(move || catalog.delete_artifact(&path)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/transcripts/{path}",
    params(("path" = String, Path, description = "`<session>/<file>` as returned by the listing")),
    responses(
        (status = 200, description = "Transcript split into entries", body = TranscriptResponse),
        (status = 400, description = "Path escapes the archive root", body = ApiError),
        (status = 404, description = "Not found", body = ApiError),
    ),
    tag = "Archive"
)]
pub(crate) async fn read_transcript(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let catalog = state.catalog.clone();
    let transcript = blocking(move || catalog.read_transcript(&path)).await?;
    Ok(Json(transcript.into()))
}
