//! Command tables for read-only security audit sessions.

/// Anything that modifies state. Searched anywhere in the command.
pub const BLOCKED_RULES: &[(&str, &str)] = &[
    // File modification
    (r"\brm\s+", "file modification"),
    (r"\bmv\s+", "file modification"),
    (r"\bcp\s+", "file modification"),
    (r"\bchmod\s+", "file modification"),
    (r"\bchown\s+", "file modification"),
    (r"\bmkdir\s+", "file modification"),
    (r"\brmdir\s+", "file modification"),
    (r"\btouch\s+", "file modification"),
    // Package modification
    (r"\bnpm\s+install", "package modification"),
    (r"\bnpm\s+uninstall", "package modification"),
    (r"\bnpm\s+update", "package modification"),
    (r"\bpip\s+install", "package modification"),
    (r"\bpip\s+uninstall", "package modification"),
    (r"\bgo\s+get", "package modification"),
    (r"\bgo\s+install", "package modification"),
    (r"\bcargo\s+install", "package modification"),
    (r"\bbundle\s+install", "package modification"),
    // Network
    (r"\bcurl\s+", "network request"),
    (r"\bwget\s+", "network request"),
    (r"\bfetch\s+", "network request"),
    // System
    (r"\bsudo\s+", "system command"),
    (r"\bsu\s+", "system command"),
    (r"\bsystemctl\s+", "system command"),
    (r"\bservice\s+", "system command"),
    // Redirects, except 2>&1
    (r">\s*[^&]", "output redirect"),
    (r">>\s*", "append redirect"),
    // Processes
    (r"\bkill\s+", "process manipulation"),
    (r"\bpkill\s+", "process manipulation"),
];

/// Read-only commands, anchored at the start of the command.
pub const ALLOWED_RULES: &[(&str, &str)] = &[
    // Dependency audits
    (r"^npm\s+audit", "dependency audit"),
    (r"^yarn\s+audit", "dependency audit"),
    (r"^pip-audit", "dependency audit"),
    (r"^safety\s+check", "dependency audit"),
    (r"^govulncheck", "dependency audit"),
    (r"^cargo\s+audit", "dependency audit"),
    (r"^bundle\s+audit", "dependency audit"),
    (r"^mvn\s+dependency-check", "dependency audit"),
    // Package listing
    (r"^npm\s+list", "package listing"),
    (r"^pip\s+list", "package listing"),
    (r"^pip\s+show", "package listing"),
    (r"^go\s+list", "package listing"),
    (r"^cargo\s+tree", "package listing"),
    (r"^bundle\s+list", "package listing"),
    // Git history
    (r"^git\s+log", "git history"),
    (r"^git\s+blame", "git history"),
    (r"^git\s+show", "git history"),
    (r"^git\s+diff", "git history"),
    (r"^git\s+status", "git history"),
    (r"^git\s+branch", "git history"),
    (r"^git\s+tag", "git history"),
    // File inspection
    (r"^file\s+", "file inspection"),
    (r"^cat\s+", "file inspection"),
    (r"^head\s+", "file inspection"),
    (r"^tail\s+", "file inspection"),
    (r"^less\s+", "file inspection"),
    (r"^wc\s+", "file inspection"),
    (r"^ls\s+", "file inspection"),
    (r"^find\s+", "file inspection"),
    (r"^grep\s+", "file inspection"),
    (r"^rg\s+", "file inspection"),
    // Environment inspection
    (r"^env$", "environment inspection"),
    (r"^printenv", "environment inspection"),
    (r"^echo\s+\$", "environment inspection"),
];

pub const ALLOWED_SUMMARY: &str = "Allowed commands for security audit: dependency audits \
(npm audit, pip-audit, cargo audit), git history (git log, git blame, git show), \
file inspection (cat, head, tail, file, ls, find, grep), package listing (npm list, pip list, go list)";
