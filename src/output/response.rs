//! Response formatting for hook output.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::OutputStyle;
use crate::decision::{Decision, TransformInfo, Verdict};

pub const EXIT_OK: u8 = 0;
/// Hard block under the legacy convention.
pub const EXIT_BLOCK: u8 = 2;
/// stdout could not be written.
pub const EXIT_WRITE_FAILED: u8 = 1;

/// What a hook process prints and how it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutput {
    pub stdout: String,
    pub exit_code: u8,
}

impl HookOutput {
    fn ok(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_OK,
        }
    }

    fn block(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_BLOCK,
        }
    }
}

/// PreToolUse response (Claude Code hook format).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreToolUseResponse {
    pub hook_specific_output: HookSpecificOutput,
}

/// The hook-specific output for PreToolUse hooks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    /// Must be "PreToolUse" for this hook type.
    pub hook_event_name: &'static str,
    /// "allow" or "deny".
    pub permission_decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
    /// Replacement tool input for transformed commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
}

/// The older `{"decision": ...}` contract.
#[derive(Debug, Serialize)]
pub struct LegacyResponse {
    pub decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Stop/SubagentStop response that lets the agent finish (or, legacy, stops it).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    #[serde(rename = "continue")]
    pub proceed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

/// Stop/SubagentStop response that sends the agent back to work.
#[derive(Debug, Serialize)]
pub struct StopBlockResponse {
    pub decision: &'static str,
    pub reason: String,
}

const DENY_FALLBACK: &str = r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","permissionDecision":"deny","permissionDecisionReason":"hook output could not be serialized"}}"#;

/// Render a PreToolUse decision.
///
/// `tool_input` and `command_field` are only consulted for transforms.
pub fn render_decision(
    decision: &Decision,
    tool_input: &Value,
    command_field: &str,
    style: OutputStyle,
) -> HookOutput {
    match style {
        OutputStyle::Current => HookOutput::ok(render_current(decision, tool_input, command_field)),
        OutputStyle::Legacy => render_legacy(decision),
    }
}

fn render_current(decision: &Decision, tool_input: &Value, command_field: &str) -> String {
    let output = match decision {
        Decision::Allow => HookSpecificOutput {
            hook_event_name: "PreToolUse",
            permission_decision: "allow",
            permission_decision_reason: None,
            updated_input: None,
        },
        Decision::Transform(info) => HookSpecificOutput {
            hook_event_name: "PreToolUse",
            permission_decision: "allow",
            permission_decision_reason: Some(info.reason()),
            updated_input: Some(updated_input(tool_input, command_field, info)),
        },
        Decision::Block(info) => HookSpecificOutput {
            hook_event_name: "PreToolUse",
            permission_decision: "deny",
            permission_decision_reason: Some(info.reason.clone()),
            updated_input: None,
        },
    };
    let response = PreToolUseResponse {
        hook_specific_output: output,
    };
    serde_json::to_string(&response).unwrap_or_else(|_| DENY_FALLBACK.to_string())
}

fn render_legacy(decision: &Decision) -> HookOutput {
    let (response, blocked) = match decision {
        Decision::Allow => (
            LegacyResponse {
                decision: "allow",
                reason: None,
            },
            false,
        ),
        Decision::Transform(info) => (
            LegacyResponse {
                decision: "allow",
                reason: Some(format!(
                    "Consider the safer command `{}` ({})",
                    info.updated, info.description
                )),
            },
            false,
        ),
        Decision::Block(info) => (
            LegacyResponse {
                decision: "block",
                reason: Some(info.reason.clone()),
            },
            true,
        ),
    };
    let json = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"decision":"block"}"#.to_string());
    if blocked {
        HookOutput::block(json)
    } else {
        HookOutput::ok(json)
    }
}

/// The original tool input with the command field replaced.
fn updated_input(tool_input: &Value, command_field: &str, info: &TransformInfo) -> Value {
    let mut fields = match tool_input {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    fields.insert(command_field.to_string(), Value::String(info.updated.clone()));
    Value::Object(fields)
}

/// Render a Stop/SubagentStop verdict.
pub fn render_verdict(verdict: &Verdict, style: OutputStyle) -> HookOutput {
    match (verdict, style) {
        (Verdict::Pass(message), _) => HookOutput::ok(stop_json(true, message.clone())),
        (Verdict::Block(reason), OutputStyle::Current) => {
            let response = StopBlockResponse {
                decision: "block",
                reason: reason.clone(),
            };
            HookOutput::ok(
                serde_json::to_string(&response)
                    .unwrap_or_else(|_| r#"{"continue":true}"#.to_string()),
            )
        }
        (Verdict::Block(reason), OutputStyle::Legacy) => {
            HookOutput::block(stop_json(false, Some(reason.clone())))
        }
    }
}

fn stop_json(proceed: bool, system_message: Option<String>) -> String {
    let response = StopResponse {
        proceed,
        system_message,
    };
    serde_json::to_string(&response).unwrap_or_else(|_| r#"{"continue":true}"#.to_string())
}
