//! Plain-text transcript format for archived sessions.
//!
//! ```text
//! Session: <label>
//! Date: <YYYY-MM-DD HH:MM:SS>
//!
//! --- Entry from <YYYY-MM-DD HH:MM:SS> ---
//! Source: <url or empty>
//! Content:
//! <content, verbatim>
//!
//! ```
//!
//! Every entry block ends with one blank line. Header lines are kept on a
//! single line; entry content is written untouched.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::models::entry::ClipboardEntry;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const SESSION_PREFIX: &str = "Session: ";
const DATE_PREFIX: &str = "Date: ";
const ENTRY_PREFIX: &str = "--- Entry from ";
const ENTRY_SUFFIX: &str = " ---";
const SOURCE_PREFIX: &str = "Source:";
const CONTENT_MARKER: &str = "Content:";
const BLOCK_BREAK: &str = "\n\n--- Entry from ";

const MAX_COMPONENT_BYTES: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub label: String,
    pub written_at: DateTime<Utc>,
    pub entries: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub captured_at: DateTime<Utc>,
    pub source_url: Option<String>,
    pub content: String,
}

/// Turn a session label into something safe to use as one path component.
pub fn sanitize_label(label: &str) -> String {
    let mapped: String = label
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == ' ' || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let mut cleaned = mapped.trim_matches(|ch| ch == ' ' || ch == '_').to_string();
    if cleaned.len() > MAX_COMPONENT_BYTES {
        let mut cut = MAX_COMPONENT_BYTES;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
        cleaned = cleaned.trim_end_matches(|ch| ch == ' ' || ch == '_').to_string();
    }

    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned
    }
}

/// File name for an artifact written at `written_at`. `attempt` > 0 adds a
/// numeric suffix for names already taken within the same second.
pub fn artifact_file_name(sanitized: &str, written_at: DateTime<Utc>, attempt: u32) -> String {
    let stamp = written_at.format(FILE_TIMESTAMP_FORMAT);
    if attempt == 0 {
        format!("{sanitized}_{stamp}.txt")
    } else {
        format!("{sanitized}_{stamp}_{attempt}.txt")
    }
}

pub fn render(label: &str, written_at: DateTime<Utc>, entries: &[ClipboardEntry]) -> String {
    let mut out = String::new();
    out.push_str(SESSION_PREFIX);
    out.push_str(&single_line(label));
    out.push('\n');
    out.push_str(DATE_PREFIX);
    out.push_str(&written_at.format(TIMESTAMP_FORMAT).to_string());
    out.push_str("\n\n");

    for entry in entries {
        out.push_str(ENTRY_PREFIX);
        out.push_str(&entry.captured_at.format(TIMESTAMP_FORMAT).to_string());
        out.push_str(ENTRY_SUFFIX);
        out.push('\n');
        out.push_str(SOURCE_PREFIX);
        out.push(' ');
        out.push_str(&single_line(entry.source_url.as_deref().unwrap_or("")));
        out.push('\n');
        out.push_str(CONTENT_MARKER);
        out.push('\n');
        out.push_str(&entry.content);
        out.push_str("\n\n");
    }
    out
}

pub fn parse(text: &str) -> AppResult<Transcript> {
    let (label, rest) = take_line(text)
        .and_then(|(line, rest)| Some((line.strip_prefix(SESSION_PREFIX)?, rest)))
        .ok_or_else(|| malformed("missing session header"))?;
    let (written_at, rest) = take_line(rest)
        .and_then(|(line, rest)| Some((parse_timestamp(line.strip_prefix(DATE_PREFIX)?)?, rest)))
        .ok_or_else(|| malformed("missing or invalid date header"))?;
    let mut body = rest
        .strip_prefix('\n')
        .ok_or_else(|| malformed("missing blank line after header"))?;

    let mut entries = Vec::new();
    while !body.is_empty() {
        let (captured_at, source_url, after_head) =
            block_head(body).ok_or_else(|| malformed("invalid entry header"))?;

        let end = next_block_start(after_head);
        let (content, next) = match end {
            Some(idx) => (&after_head[..idx], &after_head[idx + 2..]),
            None => {
                let content = after_head
                    .strip_suffix("\n\n")
                    .ok_or_else(|| malformed("last entry is not terminated"))?;
                (content, "")
            }
        };

        entries.push(TranscriptEntry {
            captured_at,
            source_url,
            content: content.to_string(),
        });
        body = next;
    }

    Ok(Transcript {
        label: label.to_string(),
        written_at,
        entries,
    })
}

/// Parse the three header lines of an entry block, returning the remainder
/// that starts at the content.
fn block_head(text: &str) -> Option<(DateTime<Utc>, Option<String>, &str)> {
    let (marker, rest) = take_line(text)?;
    let stamp = marker.strip_prefix(ENTRY_PREFIX)?.strip_suffix(ENTRY_SUFFIX)?;
    let captured_at = parse_timestamp(stamp)?;

    let (source_line, rest) = take_line(rest)?;
    let source = source_line.strip_prefix(SOURCE_PREFIX)?;
    let source = source.strip_prefix(' ').unwrap_or(source);
    let source_url = (!source.is_empty()).then(|| source.to_string());

    let (content_line, rest) = take_line(rest)?;
    if content_line != CONTENT_MARKER {
        return None;
    }
    Some((captured_at, source_url, rest))
}

/// Offset of the blank line that separates this block's content from the
/// next well-formed block, if any.
fn next_block_start(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = text[from..].find(BLOCK_BREAK) {
        let idx = from + pos;
        if block_head(&text[idx + 2..]).is_some() {
            return Some(idx);
        }
        from = idx + 1;
    }
    None
}

fn take_line(text: &str) -> Option<(&str, &str)> {
    text.split_once('\n')
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn malformed(reason: &str) -> AppError {
    AppError::Internal(format!("malformed transcript: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: i64, secs: i64, source: Option<&str>, content: &str) -> ClipboardEntry {
        ClipboardEntry {
            id,
            content: content.to_string(),
            source_url: source.map(str::to_string),
            captured_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            session_label: "Research".to_string(),
        }
    }

    fn written_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_render_layout() {
        let text = render(
            "Research",
            written_at(),
            &[entry(1, 0, Some("https://a.example"), "hello")],
        );
        assert_eq!(
            text,
            "Session: Research\n\
             Date: 2024-03-09 14:05:07\n\
             \n\
             --- Entry from 2023-11-14 22:13:20 ---\n\
             Source: https://a.example\n\
             Content:\n\
             hello\n\
             \n"
        );
    }

    #[test]
    fn test_parse_preserves_content_and_source() {
        let entries = vec![
            entry(1, 0, Some("https://a.example/x?y=1"), "  leading spaces\n\ttab line\n"),
            entry(2, 5, None, "para one\n\npara two"),
            entry(3, 9, Some("https://b.example"), "trailing blank lines\n\n\n"),
        ];
        let parsed = parse(&render("Research", written_at(), &entries)).unwrap();

        assert_eq!(parsed.label, "Research");
        assert_eq!(parsed.written_at, written_at());
        assert_eq!(parsed.entries.len(), 3);
        for (original, back) in entries.iter().zip(&parsed.entries) {
            assert_eq!(back.content, original.content);
            assert_eq!(back.source_url, original.source_url);
            assert_eq!(back.captured_at, original.captured_at);
        }
    }

    #[test]
    fn test_content_resembling_marker_without_full_header_stays_in_entry() {
        let tricky = "notes\n\n--- Entry from yesterday ---\nnot a real block";
        let parsed = parse(&render("S", written_at(), &[entry(1, 0, None, tricky)])).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].content, tricky);
    }

    #[test]
    fn test_header_fields_are_flattened() {
        let text = render(
            "two\nlines",
            written_at(),
            &[entry(1, 0, Some("https://a\r\nb"), "x")],
        );
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.label, "two lines");
        assert_eq!(parsed.entries[0].source_url.as_deref(), Some("https://a  b"));
    }

    #[test]
    fn test_parse_rejects_truncated_file() {
        let text = render("S", written_at(), &[entry(1, 0, None, "cut")]);
        let truncated = &text[..text.len() - 1];
        assert!(parse(truncated).is_err());
        assert!(parse("not a transcript").is_err());
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Research Notes"), "Research Notes");
        assert_eq!(sanitize_label("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_label("a/b\\c:d*e?f"), "a_b_c_d_e_f");
        assert_eq!(sanitize_label(".."), "session");
        assert_eq!(sanitize_label("   "), "session");
        assert_eq!(sanitize_label("Café 東京"), "Café 東京");

        let long = "é".repeat(200);
        let cut = sanitize_label(&long);
        assert!(cut.len() <= MAX_COMPONENT_BYTES);
        assert!(cut.chars().all(|ch| ch == 'é'));
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(
            artifact_file_name("Research", written_at(), 0),
            "Research_20240309_140507.txt"
        );
        assert_eq!(
            artifact_file_name("Research", written_at(), 2),
            "Research_20240309_140507_2.txt"
        );
    }
}
