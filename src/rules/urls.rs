//! Outbound URL patterns.

/// Lowercased substrings that indicate injection or traversal.
pub const INJECTION_MARKERS: &[&str] = &[
    "<script",
    "javascript:",
    "data:",
    "vbscript:",
    "file://",
    "%00",
    "../",
    "..\\",
];

/// Query parameter names that carry credentials. Matched case-insensitively.
pub const SENSITIVE_PARAMS: &[(&str, &str)] = &[
    (r"^api[_-]?key$", "API key"),
    (r"^secret$", "Secret"),
    (r"^token$", "Token"),
    (r"^password$", "Password"),
    (r"^auth$", "Auth"),
    (r"^credential$", "Credential"),
    (r"^private[_-]?key$", "Private key"),
    (r"^access[_-]?key$", "Access key"),
    (r"^session[_-]?id$", "Session id"),
];

/// Hostnames that only resolve inside a private network.
pub const INTERNAL_HOSTNAMES: &[&str] = &["localhost"];

pub const INTERNAL_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal"];

pub const ALLOWED_SCHEMES: &[&str] = &["http", "https"];
