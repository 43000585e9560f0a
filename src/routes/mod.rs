pub mod archive;
pub mod entries;
pub mod sessions;

use axum::{routing::get, Router};
use utoipa::OpenApi;

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        entries::create_entry,
        entries::list_entries,
        entries::delete_entry,
        sessions::current_session,
        sessions::rename_session,
        sessions::end_session,
        archive::list_sessions,
        archive::read_artifact,
        archive::delete_artifact,
        archive::read_transcript,
    ),
    components(schemas(
        crate::error::ApiError,
        crate::models::entry::CreateEntryRequest,
        crate::models::entry::EntryResponse,
        crate::models::session::CurrentSessionResponse,
        crate::models::session::RenameSessionRequest,
        crate::models::session::RenameSessionResponse,
        crate::models::session::EndSessionRequest,
        crate::models::session::EndSessionResponse,
        crate::models::session::SessionSummary,
        crate::models::session::ArtifactInfo,
        crate::models::session::ArtifactContent,
        crate::models::session::TranscriptResponse,
        crate::models::session::TranscriptEntryResponse,
    )),
    tags(
        (name = "Clipboard", description = "Live clipboard entries"),
        (name = "Session", description = "Current session naming and archival"),
        (name = "Archive", description = "Archived session transcripts")
    )
)]
pub struct ApiDoc;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/clipboard", entries::router())
        .nest("/api/session", sessions::router())
        .merge(archive::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Run a synchronous core call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| AppError::Internal(format!("blocking task failed: {err}")))?
}
