//! What a hook concluded about a tool call or a finished turn.

/// Outcome of a PreToolUse check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Run a rewritten command in place of the original.
    Transform(TransformInfo),
    Block(BlockInfo),
}

/// A denied tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Shown to the agent as the deny reason.
    pub reason: String,
    /// Dotted id of the check that fired, e.g. `urls.ssrf`.
    pub rule: String,
    pub details: Option<String>,
}

/// A command rewritten into a safer equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformInfo {
    pub original: String,
    pub updated: String,
    /// What the rewrite does, e.g. "Add interactive confirmation".
    pub description: String,
}

impl BlockInfo {
    pub fn new(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            reason: reason.into(),
            details: None,
        }
    }

    /// Attach the matched pattern or input excerpt.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl TransformInfo {
    /// Reason surfaced to the user: both the original and the rewritten text.
    pub fn reason(&self) -> String {
        format!(
            "Transformed for safety: {}. Original: `{}` -> Updated: `{}`",
            self.description,
            truncate(&self.original, 120),
            truncate(&self.updated, 120)
        )
    }
}

impl Decision {
    pub fn allow() -> Self {
        Decision::Allow
    }

    /// Deny with `reason`, attributed to `rule`.
    pub fn block(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Decision::Block(BlockInfo::new(rule, reason))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Block(_))
    }

    pub fn block_info(&self) -> Option<&BlockInfo> {
        match self {
            Decision::Block(info) => Some(info),
            _ => None,
        }
    }

    pub fn transform_info(&self) -> Option<&TransformInfo> {
        match self {
            Decision::Transform(info) => Some(info),
            _ => None,
        }
    }
}

/// Outcome of a Stop/SubagentStop check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Let the agent finish, optionally with a message for the transcript.
    Pass(Option<String>),
    /// Refuse to let the agent finish.
    Block(String),
}

impl Verdict {
    pub fn pass() -> Self {
        Verdict::Pass(None)
    }

    pub fn pass_with(message: impl Into<String>) -> Self {
        Verdict::Pass(Some(message.into()))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block(_))
    }
}

/// Truncate on a char boundary, appending "..." when shortened.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_is_not_a_block() {
        let d = Decision::Transform(TransformInfo {
            original: "git push".to_string(),
            updated: "git push -v".to_string(),
            description: "Add verbose output".to_string(),
        });
        assert!(!d.is_blocked());
        assert!(d.block_info().is_none());
        assert_eq!(d.transform_info().unwrap().updated, "git push -v");
    }

    #[test]
    fn test_block_carries_rule_and_pattern() {
        let d = Decision::Block(
            BlockInfo::new("commands.dangerous", "Blocked Bash command: Privilege escalation")
                .with_details("pattern: \\bsudo\\b"),
        );
        let info = d.block_info().unwrap();
        assert_eq!(info.rule, "commands.dangerous");
        assert_eq!(info.details.as_deref(), Some("pattern: \\bsudo\\b"));
    }

    #[test]
    fn test_verdicts() {
        assert!(!Verdict::pass().is_blocked());
        assert_eq!(
            Verdict::pass_with("ok"),
            Verdict::Pass(Some("ok".to_string()))
        );
        assert!(Verdict::Block("3/4 invalid".to_string()).is_blocked());
    }

    #[test]
    fn test_transform_reason_shows_both_commands() {
        let info = TransformInfo {
            original: "rm a.txt".to_string(),
            updated: "rm -i a.txt".to_string(),
            description: "Add interactive confirmation".to_string(),
        };
        let reason = info.reason();
        assert!(reason.contains("`rm a.txt`"));
        assert!(reason.contains("`rm -i a.txt`"));
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("héllo", 10), "héllo");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
