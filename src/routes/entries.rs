use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use super::blocking;
use crate::error::{ApiError, AppError};
use crate::models::entry::{CreateEntryRequest, EntryResponse, NewEntry};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/{id}", delete(delete_entry))
}

#[utoipa::path(
    post,
    path = "/api/clipboard",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry captured", body = EntryResponse),
        (status = 400, description = "Missing or empty content, or malformed body", body = ApiError),
    ),
    tag = "Clipboard"
)]
pub(crate) async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let Json(req) = payload?;
    let new: NewEntry = req.into();
    let store = state.store.clone();
    let entry = blocking(move || store.create(new)).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[utoipa::path(
    get,
    path = "/api/clipboard",
    responses(
        (status = 200, description = "Live entries, newest first", body = Vec<EntryResponse>),
    ),
    tag = "Clipboard"
)]
pub(crate) async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<EntryResponse>>, AppError> {
    let store = state.store.clone();
    let entries = blocking(move || store.list()).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/clipboard/{id}",
    params(("id" = i64, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Not found", body = ApiError),
    ),
    tag = "Clipboard"
)]
pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let store = state.store.clone();
    blocking(move || store.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
