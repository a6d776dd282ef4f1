//! Conversation transcripts stored as JSONL session files
//!
//! Each line is one JSON record. `user` and `assistant` records carry a
//! `message` whose `content` is either a string or an array of blocks; only
//! `text` blocks are kept. `summary` records carry a generated `summary` of
//! the conversation up to `leafUuid`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::Result;
use crate::search::document::meta;
use crate::search::{Document, MemoryLayer};

/// Documents parsed from one session file
#[derive(Debug, Clone, Default)]
pub struct SessionRecords {
    pub messages: Vec<Document>,
    pub summaries: Vec<Document>,
}

/// `*.jsonl` files under `root`, newest first, at most `max`
pub fn session_files(root: &Path, max: usize) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<(SystemTime, PathBuf)> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "jsonl"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.into_path())
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    files.into_iter().take(max).map(|(_, path)| path).collect()
}

/// Session id for a file: its stem
pub fn session_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse a whole session file. Malformed lines are skipped.
pub fn parse_session(path: &Path) -> Result<SessionRecords> {
    let raw = std::fs::read_to_string(path)?;
    let session_id = session_id_for(path);
    let mut records = SessionRecords::default();

    for (idx, line) in raw.lines().enumerate() {
        match parse_line(&session_id, path, idx + 1, line) {
            Some(ParsedLine::Message(doc)) => records.messages.push(doc),
            Some(ParsedLine::Summary(doc)) => records.summaries.push(doc),
            None => {}
        }
    }

    Ok(records)
}

pub enum ParsedLine {
    Message(Document),
    Summary(Document),
}

/// Parse one JSONL line into a message or summary document.
pub fn parse_line(session_id: &str, path: &Path, line_no: usize, line: &str) -> Option<ParsedLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let json: Value = serde_json::from_str(line).ok()?;
    let kind = json.get("type").and_then(Value::as_str)?;
    let session = json
        .get("sessionId")
        .and_then(Value::as_str)
        .unwrap_or(session_id);

    match kind {
        "user" | "assistant" => {
            let text = message_text(&json)?;
            let id = json
                .get("uuid")
                .and_then(Value::as_str)
                .map_or_else(|| line_hash(session, line_no), ToString::to_string);
            let mut doc = Document::new(id, text, 0.0, MemoryLayer::Transcripts)
                .with_meta(meta::SESSION_ID, session)
                .with_meta(meta::ROLE, kind)
                .with_meta(meta::FILE_PATH, path.to_string_lossy())
                .with_meta(meta::LINE, line_no.to_string());
            if let Some(ts) = json.get("timestamp").and_then(Value::as_str) {
                doc = doc.with_meta(meta::TIMESTAMP, ts);
            }
            Some(ParsedLine::Message(doc))
        }
        "summary" => {
            let summary = json.get("summary").and_then(Value::as_str)?.trim();
            if summary.is_empty() {
                return None;
            }
            let id = json.get("leafUuid").and_then(Value::as_str).map_or_else(
                || format!("summary:{}", line_hash(session, line_no)),
                |leaf| format!("summary:{leaf}"),
            );
            let doc = Document::new(id, summary, 0.0, MemoryLayer::Summaries)
                .with_meta(meta::SESSION_ID, session)
                .with_meta(meta::TITLE, summary)
                .with_meta(meta::FILE_PATH, path.to_string_lossy())
                .with_meta(meta::LINE, line_no.to_string());
            Some(ParsedLine::Summary(doc))
        }
        _ => None,
    }
}

/// Joined text of a message record, `None` when it has no text.
pub fn message_text(json: &Value) -> Option<String> {
    let content = json
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| json.get("content"))?;

    let text = match content {
        Value::String(text) => text.trim().to_string(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };

    if text.is_empty() { None } else { Some(text) }
}

fn line_hash(session_id: &str, line_no: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(b":");
    hasher.update(line_no.to_string().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}
