//! Input parsing for Claude Code hook invocations.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when parsing hook input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("empty input")]
    Empty,

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Field names MCP command runners use for the command text, in lookup order.
const COMMAND_FIELDS: &[&str] = &[
    "command",
    "cmd",
    "script",
    "shell_command",
    "bash_command",
    "exec",
    "run",
    "code",
    "input",
];

/// The raw payload Claude Code writes to a hook's stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    /// The tool being invoked (absent for Stop/SubagentStop events).
    #[serde(default)]
    pub tool_name: Option<String>,

    /// The tool's input parameters as raw JSON.
    #[serde(default)]
    pub tool_input: Value,

    /// Current working directory.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Session ID for audit logging.
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub hook_event_name: Option<String>,

    /// Main session transcript (JSONL).
    #[serde(default)]
    pub transcript_path: Option<String>,

    /// Sub-agent transcript, present on SubagentStop.
    #[serde(default)]
    pub agent_transcript_path: Option<String>,

    /// Set when the orchestrator is already continuing because of a stop hook.
    #[serde(default)]
    pub stop_hook_active: bool,
}

/// Content about to be written to disk.
#[derive(Debug, Clone)]
pub struct WritePayload {
    pub file_path: String,
    pub content: String,
}

impl HookInput {
    /// Parse from JSON string.
    pub fn parse(json: &str) -> Result<Self, InputError> {
        if json.trim().is_empty() {
            return Err(InputError::Empty);
        }
        Ok(serde_json::from_str(json.trim())?)
    }

    pub fn tool_name(&self) -> &str {
        self.tool_name.as_deref().unwrap_or("")
    }

    /// True for tools exposed by MCP servers (`mcp__server__tool`).
    pub fn is_mcp_tool(&self) -> bool {
        self.tool_name().starts_with("mcp__")
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.tool_input.get(name).and_then(Value::as_str)
    }

    /// Extract the shell command, tolerating the field layouts of MCP runners.
    pub fn command(&self) -> Option<String> {
        if self.tool_name() == "Bash" {
            return self.str_field("command").map(String::from);
        }

        for field in COMMAND_FIELDS {
            if let Some(cmd) = self.str_field(field) {
                return Some(cmd.to_string());
            }
        }

        let first = self.tool_input.get("args")?.as_array()?.first()?;
        Some(match first {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Name of the field holding the command, used when rewriting input.
    pub fn command_field(&self) -> &'static str {
        if self.tool_name() == "Bash" {
            return "command";
        }
        COMMAND_FIELDS
            .iter()
            .copied()
            .find(|f| self.str_field(f).is_some())
            .unwrap_or("command")
    }

    /// Extract the path and content of a Write, Edit or MultiEdit call.
    pub fn write_payload(&self) -> WritePayload {
        let file_path = self
            .str_field("file_path")
            .or_else(|| self.str_field("path"))
            .unwrap_or_default()
            .to_string();

        let content = match self.str_field("content").filter(|s| !s.is_empty()) {
            Some(c) => c.to_string(),
            None => match self.str_field("new_string").filter(|s| !s.is_empty()) {
                Some(c) => c.to_string(),
                None => self.multi_edit_content(),
            },
        };

        WritePayload { file_path, content }
    }

    fn multi_edit_content(&self) -> String {
        let Some(edits) = self.tool_input.get("edits").and_then(Value::as_array) else {
            return String::new();
        };
        edits
            .iter()
            .filter_map(|e| e.get("new_string").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The URL a WebFetch/WebSearch call would dereference, if any.
    pub fn url(&self) -> Option<&str> {
        match self.tool_name() {
            "WebFetch" => self.str_field("url"),
            "WebSearch" => self
                .str_field("query")
                .filter(|q| q.starts_with("http://") || q.starts_with("https://")),
            _ => None,
        }
    }

    /// The transcript to verify: the sub-agent's own transcript when present.
    pub fn transcript(&self) -> Option<&str> {
        self.agent_transcript_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.transcript_path.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// Get the primary path being accessed (for any file-based tool).
    pub fn file_path(&self) -> Option<&str> {
        self.str_field("file_path")
    }
}
