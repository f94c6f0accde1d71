//! Hook runner: parse stdin, load config, classify, render.
//!
//! Every path through [`run`] yields exactly one rendered response. Errors
//! never escape; each hook folds them into its fail policy.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::{CommandGuard, ReadOnlyGuard, ReferenceVerifier, SecretScanner, UrlValidator};
use crate::audit::{AuditEntry, AuditLogger, default_log_path};
use crate::config::{Config, ConfigError, OutputStyle};
use crate::decision::{BlockInfo, Decision, Verdict};
use crate::input::{HookInput, InputError};
use crate::output::{HookOutput, render_decision, render_verdict};

/// Errors a hook folds into its fail policy.
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// What a hook does when it cannot reach a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    /// Deny the tool call.
    Closed,
    /// Let the agent continue.
    Open,
}

/// The hooks this crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// PreToolUse on Write/Edit/MultiEdit.
    PreventSecretLeak,
    /// PreToolUse on Bash and MCP command runners.
    SafetyCheck,
    /// PreToolUse on WebFetch/WebSearch.
    ExternalContentValidator,
    /// Stop/SubagentStop.
    VerifyReferences,
    /// PreToolUse on Bash for read-only audit sub-agents.
    SecurityAuditValidator,
}

impl HookKind {
    pub fn name(self) -> &'static str {
        match self {
            HookKind::PreventSecretLeak => "prevent_secret_leak",
            HookKind::SafetyCheck => "safety_check",
            HookKind::ExternalContentValidator => "external_content_validator",
            HookKind::VerifyReferences => "verify_references",
            HookKind::SecurityAuditValidator => "security_audit_bash_validator",
        }
    }

    pub fn fail_policy(self) -> FailPolicy {
        match self {
            HookKind::VerifyReferences => FailPolicy::Open,
            _ => FailPolicy::Closed,
        }
    }

    fn output_style(self, config: &Config) -> OutputStyle {
        let style = match self {
            HookKind::PreventSecretLeak => config.secrets.output,
            HookKind::SafetyCheck => config.commands.output,
            HookKind::ExternalContentValidator => config.urls.output,
            HookKind::VerifyReferences => config.references.output,
            HookKind::SecurityAuditValidator => config.audit_mode.output,
        };
        style.unwrap_or_default()
    }

    /// Prefix for deny reasons produced by an internal failure.
    fn failure_prefix(self) -> &'static str {
        match self {
            HookKind::PreventSecretLeak => "Secret leak check failed: ",
            HookKind::SafetyCheck => "Safety check failed: ",
            HookKind::ExternalContentValidator => "External content validation failed: ",
            HookKind::VerifyReferences => "Reference verification failed: ",
            HookKind::SecurityAuditValidator => "Security Audit Mode: ",
        }
    }
}

/// A classifier's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Decision(Decision),
    Verdict(Verdict),
}

/// Run `kind` against the raw stdin payload.
pub fn run(kind: HookKind, raw: &str) -> HookOutput {
    let parsed = HookInput::parse(raw);

    let cwd = parsed
        .as_ref()
        .ok()
        .and_then(|input| input.cwd.as_deref())
        .filter(|cwd| !cwd.is_empty())
        .map(Path::new);
    let (config, config_error) = match Config::load(cwd) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let style = kind.output_style(&config);

    let (input, result) = match parsed {
        Ok(input) => {
            let result = match config_error {
                Some(e) => Err(HookError::from(e)),
                None => evaluate(kind, &input, &config),
            };
            (Some(input), result)
        }
        Err(e) => (None, Err(HookError::from(e))),
    };

    let outcome = result.unwrap_or_else(|e| fail(kind, &e));
    audit(kind, &config, input.as_ref(), &outcome);

    match &outcome {
        Outcome::Decision(decision) => {
            let (tool_input, command_field) = match &input {
                Some(input) => (&input.tool_input, input.command_field()),
                None => (&Value::Null, "command"),
            };
            render_decision(decision, tool_input, command_field, style)
        }
        Outcome::Verdict(verdict) => render_verdict(verdict, style),
    }
}

/// Run the classifier for `kind` on a parsed input.
pub fn evaluate(kind: HookKind, input: &HookInput, config: &Config) -> Result<Outcome, HookError> {
    let outcome = match kind {
        HookKind::PreventSecretLeak => {
            let scanner = SecretScanner::new(&config.secrets)?;
            Outcome::Decision(scanner.check(&input.write_payload()))
        }
        HookKind::SafetyCheck => Outcome::Decision(CommandGuard::new(&config.commands)?.check(input)),
        HookKind::ExternalContentValidator => {
            Outcome::Decision(UrlValidator::new(&config.urls)?.check(input))
        }
        HookKind::VerifyReferences => {
            Outcome::Verdict(ReferenceVerifier::new(&config.references).check(input))
        }
        HookKind::SecurityAuditValidator => Outcome::Decision(ReadOnlyGuard::new()?.check(input)),
    };
    Ok(outcome)
}

fn fail(kind: HookKind, error: &HookError) -> Outcome {
    tracing::warn!(hook = kind.name(), %error, "hook failed, applying fail policy");
    match kind.fail_policy() {
        FailPolicy::Open => Outcome::Verdict(Verdict::pass()),
        FailPolicy::Closed => Outcome::Decision(Decision::Block(BlockInfo::new(
            "hook.error",
            format!("{}{}", kind.failure_prefix(), error),
        ))),
    }
}

fn audit(kind: HookKind, config: &Config, input: Option<&HookInput>, outcome: &Outcome) {
    if !config.audit.enabled {
        return;
    }
    let Some(path) = config
        .audit
        .path
        .as_deref()
        .map(PathBuf::from)
        .or_else(default_log_path)
    else {
        return;
    };

    let entry = match outcome {
        Outcome::Decision(decision) => AuditEntry::for_decision(kind.name(), input, decision),
        Outcome::Verdict(verdict) => AuditEntry::for_verdict(kind.name(), input, verdict),
    };
    let written = AuditLogger::open(&path).and_then(|mut logger| logger.log(&entry));
    if let Err(e) = written {
        tracing::warn!(path = %path.display(), error = %e, "failed to write audit log");
    }
}
