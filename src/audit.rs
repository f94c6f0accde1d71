//! Audit logging for hook decisions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::decision::{Decision, Verdict, truncate};
use crate::input::HookInput;
use crate::output::redact_secrets;

const SUMMARY_CHARS: usize = 200;

/// An audit log entry.
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Which hook produced the entry.
    pub hook: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// `allow`, `transform`, `block` or `pass`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Redacted, truncated command, path or URL.
    pub summary: String,
}

impl AuditEntry {
    /// Entry for a PreToolUse decision. `input` is `None` when it failed to parse.
    pub fn for_decision(hook: &'static str, input: Option<&HookInput>, decision: &Decision) -> Self {
        let (outcome, rule, reason) = match decision {
            Decision::Allow => ("allow", None, None),
            Decision::Transform(info) => ("transform", None, Some(info.reason())),
            Decision::Block(info) => ("block", Some(info.rule.clone()), Some(info.reason.clone())),
        };
        Self::build(hook, input, outcome, rule, reason)
    }

    /// Entry for a Stop/SubagentStop verdict.
    pub fn for_verdict(hook: &'static str, input: Option<&HookInput>, verdict: &Verdict) -> Self {
        let (outcome, reason) = match verdict {
            Verdict::Pass(message) => ("pass", message.clone()),
            Verdict::Block(reason) => ("block", Some(reason.clone())),
        };
        Self::build(hook, input, outcome, None, reason)
    }

    fn build(
        hook: &'static str,
        input: Option<&HookInput>,
        outcome: &'static str,
        rule: Option<String>,
        reason: Option<String>,
    ) -> Self {
        let summary = input
            .and_then(summarize)
            .map(|s| truncate(&redact_secrets(&s), SUMMARY_CHARS))
            .unwrap_or_else(|| "<unknown>".to_string());

        Self {
            timestamp: Utc::now(),
            session_id: input.and_then(|i| i.session_id.clone()),
            hook,
            tool: input.and_then(|i| i.tool_name.clone()),
            outcome,
            rule,
            reason: reason.map(|r| redact_secrets(&r)),
            summary,
        }
    }
}

/// The most telling part of the input: command, then path, then URL, then transcript.
fn summarize(input: &HookInput) -> Option<String> {
    input
        .command()
        .filter(|c| !c.is_empty())
        .or_else(|| input.file_path().map(String::from))
        .or_else(|| input.url().map(String::from))
        .or_else(|| input.transcript().map(String::from))
}

/// Default log location when auditing is enabled without a path.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude/hook-guard-audit.jsonl"))
}

/// Audit logger for writing entries to a file.
pub struct AuditLogger {
    file: File,
}

impl AuditLogger {
    /// Open or create an audit log file, creating its directory if needed.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Write an audit entry to the log.
    pub fn log(&mut self, entry: &AuditEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", json)?;
        self.file.flush()
    }
}
