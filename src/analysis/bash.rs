//! Shell command analysis for Bash and MCP command runners.

use crate::config::{CommandsConfig, ConfigError, RuleVersion};
use crate::decision::{BlockInfo, Decision, TransformInfo};
use crate::input::HookInput;
use crate::rules::commands::{
    DANGEROUS_RULES, EnvSecretRule, LEGACY_DENY_RULES, TransformRule, compile_env_secret_rules,
    compile_transform_rules,
};
use crate::rules::{Rule, RuleTable};

/// Classifies commands as deny, transform or allow.
#[derive(Debug)]
pub struct CommandGuard {
    version: RuleVersion,
    transforms_enabled: bool,
    user_deny: RuleTable,
    env_secrets: Vec<EnvSecretRule>,
    dangerous: RuleTable,
    transforms: Vec<TransformRule>,
}

impl CommandGuard {
    pub fn new(config: &CommandsConfig) -> Result<Self, ConfigError> {
        let version = config.ruleset.unwrap_or_default();

        let user_deny = config
            .deny
            .iter()
            .map(|rule| Rule::new(&rule.pattern, rule.reason.clone()))
            .collect::<Result<RuleTable, _>>()?;

        let (env_secrets, dangerous, transforms) = match version {
            RuleVersion::Current => (
                compile_env_secret_rules()?,
                RuleTable::compile(DANGEROUS_RULES, true)?,
                compile_transform_rules()?,
            ),
            RuleVersion::Legacy => (
                Vec::new(),
                RuleTable::compile(LEGACY_DENY_RULES, true)?,
                Vec::new(),
            ),
        };

        Ok(Self {
            version,
            transforms_enabled: config.transforms.unwrap_or(true),
            user_deny,
            env_secrets,
            dangerous,
            transforms,
        })
    }

    /// Classify the command carried by `input`.
    pub fn check(&self, input: &HookInput) -> Decision {
        let Some(command) = input.command() else {
            return Decision::allow();
        };
        let command = command.trim();
        if command.is_empty() {
            return Decision::allow();
        }
        // A missing tool name is the native Bash tool
        let tool_name = match input.tool_name() {
            "" => "Bash",
            name => name,
        };
        self.classify(tool_name, command)
    }

    /// Classify `command` as issued through `tool_name`.
    pub fn classify(&self, tool_name: &str, command: &str) -> Decision {
        let source = command_source(tool_name);

        // 1. Explicit deny rules
        if let Some(rule) = self.user_deny.first_match(command) {
            return Decision::Block(
                BlockInfo::new("commands.deny", format!("Blocked {}: {}", source, rule.label))
                    .with_details(format!("pattern: {}", rule.pattern)),
            );
        }

        // 2. Credentials exported as literals
        if let Some(rule) = self.env_secrets.iter().find(|r| r.is_match(command)) {
            tracing::debug!(label = rule.label, "env secret export");
            return Decision::Block(
                BlockInfo::new(
                    "commands.env_secret",
                    format!(
                        "Blocked {} command: {} secret export ({}). Use .env files or a \
                         secrets manager instead of exporting secrets directly in shell commands.",
                        source,
                        rule.kind.as_str(),
                        rule.label
                    ),
                )
                .with_details(rule.label),
            );
        }

        // 3. Built-in dangerous table
        if let Some(rule) = self.dangerous.first_match(command) {
            tracing::debug!(label = %rule.label, "dangerous command");
            let reason = match self.version {
                RuleVersion::Current => format!(
                    "Blocked {} command: {} (pattern: {})",
                    source, rule.label, rule.pattern
                ),
                RuleVersion::Legacy => format!("Blocked dangerous command: {}", rule.label),
            };
            return Decision::Block(
                BlockInfo::new("commands.dangerous", reason)
                    .with_details(format!("pattern: {}", rule.pattern)),
            );
        }

        // 4. Safer rewrites, native Bash only
        if self.transforms_enabled && tool_name == "Bash" {
            for rule in &self.transforms {
                if let Some(updated) = rule.apply(command) {
                    return Decision::Transform(TransformInfo {
                        original: command.to_string(),
                        updated,
                        description: rule.description.to_string(),
                    });
                }
            }
        }

        Decision::allow()
    }
}

/// How the command arrived, for deny reasons.
fn command_source(tool_name: &str) -> String {
    if tool_name == "Bash" {
        "Bash".to_string()
    } else {
        format!("MCP tool ({})", tool_name)
    }
}
