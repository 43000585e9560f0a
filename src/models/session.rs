use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::archive::transcript::{Transcript, TranscriptEntry};

// ── Session lifecycle ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentSessionResponse {
    pub label: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameSessionRequest {
    pub label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenameSessionResponse {
    pub label: String,
    /// Number of live entries moved under the new label
    pub relabeled: usize,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EndSessionRequest {
    /// Session to archive. Defaults to the current session.
    pub label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EndSessionResponse {
    /// Path of the new transcript, relative to the archive root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    pub entry_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ── Archive catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactInfo {
    pub name: String,
    pub relative_path: String,
    /// Size in bytes
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub label: String,
    pub artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArtifactContent {
    pub content: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TranscriptEntryResponse {
    pub captured_at: DateTime<Utc>,
    pub source_url: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TranscriptResponse {
    pub label: String,
    pub written_at: DateTime<Utc>,
    pub entries: Vec<TranscriptEntryResponse>,
}

impl From<TranscriptEntry> for TranscriptEntryResponse {
    fn from(entry: TranscriptEntry) -> Self {
        Self {
            captured_at: entry.captured_at,
            source_url: entry.source_url,
            content: entry.content,
        }
    }
}

impl From<Transcript> for TranscriptResponse {
    fn from(transcript: Transcript) -> Self {
        Self {
            label: transcript.label,
            written_at: transcript.written_at,
            entries: transcript.entries.into_iter().map(Into::into).collect(),
        }
    }
}
