use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Label given to entries when no session has been named yet.
pub const DEFAULT_SESSION_LABEL: &str = "Untitled Session";

// ── Database rows ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub id: i64,
    pub content: String,
    pub source_url: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub session_label: String,
}

/// Fields a client supplies when capturing an entry.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub content: String,
    pub source_url: Option<String>,
    pub session_label: Option<String>,
}

// ── API types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEntryRequest {
    pub content: Option<String>,
    /// Page the text was copied from
    pub source_url: Option<String>,
    /// Session to file the entry under. Defaults to the current session.
    pub session_label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntryResponse {
    pub id: i64,
    pub content: String,
    pub source_url: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub session_label: String,
}

impl From<ClipboardEntry> for EntryResponse {
    fn from(entry: ClipboardEntry) -> Self {
        Self {
            id: entry.id,
            content: entry.content,
            source_url: entry.source_url,
            captured_at: entry.captured_at,
            session_label: entry.session_label,
        }
    }
}

impl From<CreateEntryRequest> for NewEntry {
    fn from(req: CreateEntryRequest) -> Self {
        Self {
            content: req.content.unwrap_or_default(),
            source_url: req.source_url,
            session_label: req.session_label,
        }
    }
}
