//! Read-only audit mode: only inspection commands may run.

use crate::config::ConfigError;
use crate::decision::{BlockInfo, Decision, truncate};
use crate::input::HookInput;
use crate::rules::RuleTable;
use crate::rules::readonly::{ALLOWED_RULES, ALLOWED_SUMMARY, BLOCKED_RULES};

#[derive(Debug)]
pub struct ReadOnlyGuard {
    blocked: RuleTable,
    allowed: RuleTable,
}

impl ReadOnlyGuard {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            blocked: RuleTable::compile(BLOCKED_RULES, true)?,
            allowed: RuleTable::compile(ALLOWED_RULES, true)?,
        })
    }

    pub fn check(&self, input: &HookInput) -> Decision {
        let command = input
            .tool_input
            .get("command")
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        self.classify(command)
    }

    /// Blocked patterns win over the allow-list; unknown commands are denied.
    pub fn classify(&self, command: &str) -> Decision {
        let command = command.trim();
        if command.is_empty() {
            return Decision::allow();
        }

        if let Some(rule) = self.blocked.first_match(command) {
            return deny(
                "audit_mode.blocked",
                format!("Blocked pattern detected: {} ({})", rule.pattern, rule.label),
                command,
            );
        }

        if let Some(rule) = self.allowed.first_match(command) {
            tracing::debug!(label = %rule.label, "read-only command allowed");
            return Decision::allow();
        }

        deny(
            "audit_mode.not_allowed",
            "Command not in allowed list for security audit mode".to_string(),
            command,
        )
    }
}

fn deny(rule: &str, why: String, command: &str) -> Decision {
    Decision::Block(
        BlockInfo::new(rule, format!("Security Audit Mode: {}. {}", why, ALLOWED_SUMMARY))
            .with_details(format!("command: {}", truncate(command, 100))),
    )
}
