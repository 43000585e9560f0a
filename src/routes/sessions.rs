use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};

use super::blocking;
use crate::archive::writer::EndSessionOutcome;
use crate::error::{ApiError, AppError};
use crate::models::session::{
    CurrentSessionResponse, EndSessionRequest, EndSessionResponse, RenameSessionRequest,
    RenameSessionResponse,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current_session).put(rename_session))
        .route("/end", post(end_session))
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Label new entries will be filed under", body = CurrentSessionResponse),
    ),
    tag = "Session"
)]
pub(crate) async fn current_session(
    State(state): State<AppState>,
) -> Result<Json<CurrentSessionResponse>, AppError> {
    let sessions = state.sessions.clone();
    let label = blocking(move || sessions.current_label()).await?;
    Ok(Json(CurrentSessionResponse { label }))
}

#[utoipa::path(
    put,
    path = "/api/session",
    request_body = RenameSessionRequest,
    responses(
        (status = 200, description = "All live entries relabeled", body = RenameSessionResponse),
        (status = 400, description = "Missing or empty label", body = ApiError),
    ),
    tag = "Session"
)]
pub(crate) async fn rename_session(
    State(state): State<AppState>,
    payload: Result<Json<RenameSessionRequest>, JsonRejection>,
) -> Result<Json<RenameSessionResponse>, AppError> {
    let Json(req) = payload?;
    let label = req
        .label
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .ok_or_else(|| AppError::Validation("label is required".to_string()))?;

    let sessions = state.sessions.clone();
    let new_label = label.clone();
    let relabeled = blocking(move || sessions.rename_current_session(&new_label)).await?;
    Ok(Json(RenameSessionResponse { label, relabeled }))
}

#[utoipa::path(
    post,
    path = "/api/session/end",
    request_body = EndSessionRequest,
    responses(
        (status = 200, description = "Transcript written, or nothing to archive", body = EndSessionResponse),
        (status = 500, description = "Transcript could not be written; entries kept", body = ApiError),
    ),
    tag = "Session"
)]
pub(crate) async fn end_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EndSessionResponse>, AppError> {
    // An empty body ends whatever session is current.
    let req: EndSessionRequest = if body.is_empty() {
        EndSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| AppError::Validation(format!("invalid request body: {err}")))?
    };
    let requested = req.label.filter(|label| !label.trim().is_empty());

    let sessions = state.sessions.clone();
    let writer = state.archive.clone();
    let (label, outcome) = blocking(move || {
        let label = match requested {
            Some(label) => label,
            None => sessions.current_label()?,
        };
        let outcome = writer.end_session(&label)?;
        Ok((label, outcome))
    })
    .await?;

    let response = match outcome {
        EndSessionOutcome::Archived(artifact) => EndSessionResponse {
            artifact_path: Some(artifact.relative_path),
            entry_count: artifact.entry_count,
            message: None,
        },
        EndSessionOutcome::NoOp => EndSessionResponse {
            artifact_path: None,
            entry_count: 0,
            message: Some(format!("No items to archive for session '{}'", label.trim())),
        },
    };
    Ok(Json(response))
}
