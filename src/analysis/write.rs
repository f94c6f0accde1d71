//! Write/Edit content analysis: secret leak prevention.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::config::{ConfigError, RuleVersion, SecretsConfig, compile_regex_ci};
use crate::decision::{BlockInfo, Decision};
use crate::input::WritePayload;
use crate::rules::secrets::{
    CURRENT_ALLOWED_FILES, CURRENT_ALLOWED_PATHS, CURRENT_SIGNATURES, LEGACY_ALLOWED_PATHS,
    LEGACY_SIGNATURES, PLACEHOLDER_MARKERS, Signature,
};
use crate::rules::{Rule, RuleTable};

/// `name = "candidate"` where the candidate is base64-shaped.
static BASE64_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[A-Za-z0-9_.\-]+\s*[=:]\s*["']([A-Za-z0-9+/_\-]{24,}={0,3})["']"#)
        .expect("valid base64 assignment regex")
});

const ADVICE: &str = "Use environment variables or a secrets manager instead.";

/// Scans file content for credentials before it is written.
#[derive(Debug)]
pub struct SecretScanner {
    version: RuleVersion,
    signatures: RuleTable,
    /// Subset re-applied to decoded base64 candidates.
    decoded_signatures: RuleTable,
    allowed_files: Vec<String>,
    allowed_paths: Vec<Regex>,
}

impl SecretScanner {
    pub fn new(config: &SecretsConfig) -> Result<Self, ConfigError> {
        let version = config.ruleset.unwrap_or_default();
        let (table, allowed_paths, allowed_files): (&[Signature], &[&str], &[&str]) = match version
        {
            RuleVersion::Current => (
                CURRENT_SIGNATURES,
                CURRENT_ALLOWED_PATHS,
                CURRENT_ALLOWED_FILES,
            ),
            RuleVersion::Legacy => (LEGACY_SIGNATURES, LEGACY_ALLOWED_PATHS, &[]),
        };

        // Current signatures ignore case; legacy ones are exact
        let compile = |s: &Signature| match version {
            RuleVersion::Current => Rule::case_insensitive(s.pattern, s.label),
            RuleVersion::Legacy => Rule::new(s.pattern, s.label),
        };

        let mut signatures = table.iter().map(compile).collect::<Result<RuleTable, _>>()?;
        for extra in &config.patterns {
            signatures.push(Rule::new(&extra.pattern, extra.label.clone())?);
        }

        let decoded_signatures = table
            .iter()
            .filter(|s| s.high_value)
            .map(compile)
            .collect::<Result<RuleTable, _>>()?;

        let allowed_paths = allowed_paths
            .iter()
            .copied()
            .chain(config.allowed_paths.iter().map(String::as_str))
            .map(compile_regex_ci)
            .collect::<Result<Vec<_>, _>>()?;

        let allowed_files = allowed_files
            .iter()
            .map(|s| s.to_string())
            .chain(config.allowed_files.iter().cloned())
            .collect();

        Ok(Self {
            version,
            signatures,
            decoded_signatures,
            allowed_files,
            allowed_paths,
        })
    }

    /// Template, example and documentation paths are never scanned.
    pub fn is_allowlisted(&self, file_path: &str) -> bool {
        if file_path.is_empty() {
            return false;
        }
        let file_name = Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path);
        if self.allowed_files.iter().any(|f| f == file_name) {
            return true;
        }
        self.allowed_paths.iter().any(|re| re.is_match(file_path))
    }

    /// Labels of every secret found in `content`, in table order, deduplicated.
    pub fn find_secrets(&self, content: &str) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        let mut add = |label: String| {
            if !labels.contains(&label) {
                labels.push(label);
            }
        };

        for rule in self.signatures.matches(content) {
            add(rule.label.clone());
        }

        for decoded in base64_candidates(content) {
            let text = String::from_utf8_lossy(&decoded);
            for rule in self.decoded_signatures.matches(&text) {
                add(format!("{} (base64-encoded)", rule.label));
            }
        }

        labels
    }

    /// Decide whether `payload` may be written.
    pub fn check(&self, payload: &WritePayload) -> Decision {
        if self.is_allowlisted(&payload.file_path) {
            tracing::debug!(path = %payload.file_path, "allow-listed path, skipping scan");
            return Decision::allow();
        }
        if payload.content.is_empty() {
            return Decision::allow();
        }

        match self.version {
            RuleVersion::Current => self.check_current(&payload.content),
            RuleVersion::Legacy => self.check_legacy(&payload.content),
        }
    }

    fn check_current(&self, content: &str) -> Decision {
        let labels = self.find_secrets(content);
        if labels.is_empty() {
            return Decision::allow();
        }
        Decision::Block(
            BlockInfo::new(
                "secrets.content",
                format!(
                    "Potential secrets detected: {}. {}",
                    labels.join(", "),
                    ADVICE
                ),
            )
            .with_details(format!("{} signature(s) matched", labels.len())),
        )
    }

    fn check_legacy(&self, content: &str) -> Decision {
        for rule in self.signatures.iter() {
            let Some(found) = rule.find(content) else {
                continue;
            };
            let matched = found.as_str();
            let upper = matched.to_uppercase();
            if PLACEHOLDER_MARKERS.iter().any(|p| upper.contains(p)) {
                continue;
            }
            return Decision::Block(
                BlockInfo::new(
                    "secrets.content",
                    format!(
                        "{}: {}...",
                        rule.label,
                        matched.chars().take(30).collect::<String>()
                    ),
                )
                .with_details(ADVICE),
            );
        }
        Decision::allow()
    }
}

/// Decode a base64 candidate (standard or URL-safe, padded or not).
///
/// Returns `None` for anything that is not valid base64 of at least 24 chars.
pub fn decode_candidate(text: &str) -> Option<Vec<u8>> {
    let trimmed = text.trim();
    let body = trimmed.trim_end_matches('=');
    if body.len() < 24 || trimmed.len() - body.len() > 3 {
        return None;
    }
    let is_alphabet = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_');
    if !body.chars().all(is_alphabet) {
        return None;
    }

    STANDARD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(body))
        .or_else(|_| URL_SAFE.decode(trimmed))
        .or_else(|_| URL_SAFE_NO_PAD.decode(body))
        .ok()
}

/// Decoded payloads of base64-looking values in assignment context.
fn base64_candidates(content: &str) -> impl Iterator<Item = Vec<u8>> + '_ {
    BASE64_ASSIGNMENT
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| decode_candidate(m.as_str()))
}
