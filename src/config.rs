//! Configuration loading and merging.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid regex pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Which revision of a hook's rule table is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleVersion {
    /// The earlier, smaller tables.
    Legacy,
    #[default]
    Current,
}

/// Which output contract a hook speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// `{"decision": ..., "reason": ...}` with exit code 2 on block.
    Legacy,
    /// `hookSpecificOutput` JSON, always exit code 0.
    #[default]
    Current,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub secrets: SecretsConfig,
    pub commands: CommandsConfig,
    pub urls: UrlsConfig,
    pub references: ReferencesConfig,
    pub audit_mode: AuditModeConfig,
    pub audit: AuditConfig,
}

/// Secret leak prevention settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecretsConfig {
    pub ruleset: Option<RuleVersion>,
    pub output: Option<OutputStyle>,
    /// Extra file names exempt from scanning.
    pub allowed_files: Vec<String>,
    /// Extra path regexes exempt from scanning.
    pub allowed_paths: Vec<String>,
    /// Extra secret signatures.
    pub patterns: Vec<PatternRule>,
}

/// A user-defined secret signature.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub label: String,
}

/// Dangerous command settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CommandsConfig {
    pub ruleset: Option<RuleVersion>,
    pub output: Option<OutputStyle>,
    /// Rewrite transformable commands (default true).
    pub transforms: Option<bool>,
    /// Explicit deny rules, checked before the built-in tables.
    pub deny: Vec<DenyRule>,
}

/// Explicit deny rule.
#[derive(Debug, Clone, Deserialize)]
pub struct DenyRule {
    /// Regex pattern to match against the command.
    pub pattern: String,
    /// Human-readable reason for blocking.
    pub reason: String,
}

/// URL validation settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UrlsConfig {
    pub output: Option<OutputStyle>,
    pub max_url_length: Option<usize>,
    /// When non-empty, only these domains (and their subdomains) may be fetched.
    pub allow_domains: Vec<String>,
    /// Never fetch these domains or their subdomains.
    pub deny_domains: Vec<String>,
}

/// Reference verification settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReferencesConfig {
    pub output: Option<OutputStyle>,
    pub threshold_percent: Option<u32>,
    pub max_references: Option<usize>,
    pub max_transcript_bytes: Option<u64>,
    /// Extra path markers a transcript must resolve into.
    pub transcript_roots: Vec<String>,
    /// Extra subdirectories searched for relative references.
    pub search_dirs: Vec<String>,
}

/// Read-only audit mode settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuditModeConfig {
    pub output: Option<OutputStyle>,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging.
    pub enabled: bool,
    /// Path to audit log file.
    pub path: Option<String>,
}

pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;
pub const DEFAULT_THRESHOLD_PERCENT: u32 = 30;
pub const DEFAULT_MAX_REFERENCES: usize = 500;
pub const DEFAULT_MAX_TRANSCRIPT_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_TRANSCRIPT_ROOTS: &[&str] = &["/.claude/", "/claude-code/", "/tmp/claude"];
pub const DEFAULT_SEARCH_DIRS: &[&str] = &["src", "lib", "app"];

impl Config {
    /// Load configuration, merging user and project configs.
    pub fn load(cwd: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // ~/.claude/hook-guard.toml
        if let Some(user_config) = Self::load_user_config()? {
            config = user_config;
        }

        // .hook-guard.toml in cwd
        if let Some(cwd) = cwd
            && let Some(project_config) = Self::load_project_config(cwd)?
        {
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn load_user_config() -> Result<Option<Self>, ConfigError> {
        let path = Self::user_config_path();
        if let Some(path) = path
            && path.exists()
        {
            let content = fs::read_to_string(&path)?;
            return Ok(Some(Self::from_toml(&content)?));
        }
        Ok(None)
    }

    fn load_project_config(cwd: &Path) -> Result<Option<Self>, ConfigError> {
        let path = cwd.join(".hook-guard.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            return Ok(Some(Self::from_toml(&content)?));
        }
        Ok(None)
    }

    /// Get user config path.
    /// Respects ACO_HOOK_GUARD_CONFIG env var for testing.
    fn user_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ACO_HOOK_GUARD_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(".claude/hook-guard.toml"))
    }

    /// Merge a project config into this one.
    ///
    /// The project file lives in the tree the agent edits, so it can only
    /// tighten: it adds deny rules, signatures and deny-listed domains, lowers
    /// limits and picks output styles. Rule sets, allow-lists, transforms and
    /// the audit log path come from the user file alone.
    fn merge(&mut self, other: Config) {
        let Config {
            secrets,
            commands,
            urls,
            references,
            audit_mode,
            audit,
        } = other;

        self.secrets.patterns.extend(secrets.patterns);
        override_with(&mut self.secrets.output, secrets.output);

        self.commands.deny.extend(commands.deny);
        override_with(&mut self.commands.output, commands.output);

        self.urls.deny_domains.extend(urls.deny_domains);
        // An allow-list may be introduced, never widened
        if self.urls.allow_domains.is_empty() {
            self.urls.allow_domains = urls.allow_domains;
        }
        override_with(&mut self.urls.output, urls.output);
        lower_to(
            &mut self.urls.max_url_length,
            urls.max_url_length,
            DEFAULT_MAX_URL_LENGTH,
        );

        self.references
            .transcript_roots
            .extend(references.transcript_roots);
        self.references.search_dirs.extend(references.search_dirs);
        override_with(&mut self.references.output, references.output);
        lower_to(
            &mut self.references.threshold_percent,
            references.threshold_percent,
            DEFAULT_THRESHOLD_PERCENT,
        );

        override_with(&mut self.audit_mode.output, audit_mode.output);

        if audit.enabled {
            self.audit.enabled = true;
        }
    }
}

fn override_with<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Keep the smaller of the effective limit and `value`.
fn lower_to<T: Ord + Copy>(slot: &mut Option<T>, value: Option<T>, default: T) {
    if let Some(value) = value {
        *slot = Some(slot.unwrap_or(default).min(value));
    }
}

impl ReferencesConfig {
    pub fn threshold_percent(&self) -> u32 {
        self.threshold_percent.unwrap_or(DEFAULT_THRESHOLD_PERCENT)
    }

    pub fn max_references(&self) -> usize {
        self.max_references.unwrap_or(DEFAULT_MAX_REFERENCES)
    }

    pub fn max_transcript_bytes(&self) -> u64 {
        self.max_transcript_bytes
            .unwrap_or(DEFAULT_MAX_TRANSCRIPT_BYTES)
    }

    /// Built-in transcript roots followed by configured ones.
    pub fn transcript_roots(&self) -> Vec<String> {
        DEFAULT_TRANSCRIPT_ROOTS
            .iter()
            .map(|s| s.to_string())
            .chain(self.transcript_roots.iter().cloned())
            .collect()
    }

    pub fn search_dirs(&self) -> Vec<String> {
        DEFAULT_SEARCH_DIRS
            .iter()
            .map(|s| s.to_string())
            .chain(self.search_dirs.iter().cloned())
            .collect()
    }
}

/// Compile a pattern, reporting which one failed.
pub fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Regex {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Compile a pattern with case-insensitive matching.
pub fn compile_regex_ci(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::Regex {
            pattern: pattern.to_string(),
            source: e,
        })
}
