//! Session transcript access: path trust checks and assistant text extraction.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons a transcript is not read.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("path traversal detected")]
    Traversal,

    #[error("path resolution failed: {0}")]
    Resolve(#[source] io::Error),

    #[error("path not in expected Claude directory: {0}")]
    Untrusted(String),

    #[error("failed to read transcript: {0}")]
    Io(#[from] io::Error),
}

/// Assistant text from a transcript, or a note that it was too big to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptText {
    Text(String),
    TooLarge { bytes: u64 },
}

/// Resolve a transcript path, requiring it to land under a trusted root.
///
/// `roots` are substrings matched case-insensitively against the
/// canonical path, e.g. `/.claude/`.
pub fn resolve_path(path: &str, roots: &[String]) -> Result<PathBuf, TranscriptError> {
    if path.contains("..") {
        return Err(TranscriptError::Traversal);
    }

    let resolved = expand_tilde(path)
        .canonicalize()
        .map_err(TranscriptError::Resolve)?;

    let lowered = resolved.to_string_lossy().to_lowercase();
    if roots
        .iter()
        .any(|root| !root.is_empty() && lowered.contains(&root.to_lowercase()))
    {
        Ok(resolved)
    } else {
        Err(TranscriptError::Untrusted(resolved.display().to_string()))
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Read the assistant-authored text of a JSONL transcript.
pub fn load(path: &Path, max_bytes: u64) -> Result<TranscriptText, TranscriptError> {
    let bytes = fs::metadata(path)?.len();
    if bytes > max_bytes {
        return Ok(TranscriptText::TooLarge { bytes });
    }
    let raw = fs::read(path)?;
    Ok(TranscriptText::Text(assistant_text(&String::from_utf8_lossy(
        &raw,
    ))))
}

/// Join the text of every assistant record, one part per line.
///
/// The role is read from the record itself or from its nested `message`.
/// Lines that are not JSON objects are skipped.
pub fn assistant_text(jsonl: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    for line in jsonl.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(record) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(message) = assistant_message(&record) else {
            continue;
        };
        match message.get("content") {
            Some(Value::String(text)) if !text.is_empty() => parts.push(text.clone()),
            Some(Value::Array(blocks)) => parts.extend(blocks.iter().filter_map(block_text)),
            _ => {}
        }
    }

    parts.join("\n")
}

fn assistant_message(record: &Value) -> Option<&Value> {
    let is_assistant = |v: &Value| v.get("role").and_then(Value::as_str) == Some("assistant");
    if is_assistant(record) {
        return Some(record);
    }
    record.get("message").filter(|m| is_assistant(m))
}

fn block_text(block: &Value) -> Option<String> {
    match block {
        Value::String(text) => Some(text.clone()),
        Value::Object(_) if block.get("type").and_then(Value::as_str) == Some("text") => block
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from),
        _ => None,
    }
}
