//! Stop/SubagentStop analysis: verify `file:line` references an agent cited.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ReferencesConfig;
use crate::decision::Verdict;
use crate::input::HookInput;
use crate::transcript::{self, TranscriptText};

/// Delimiter or start, optional path prefix, `name.ext`, `:`, digits.
/// The trailing delimiter is checked separately so it is not consumed.
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)(?:^|[\s(\[{`'"])((?:[a-zA-Z0-9_\-./]+/)?[a-zA-Z0-9_\-]+\.[a-zA-Z0-9]+):(\d+)"#,
    )
    .expect("valid reference regex")
});

const TRAILING_DELIMITERS: &[char] = &[')', ']', '}', '`', '\'', '"', ',', ':'];

/// Invalid references listed in a block message.
const SHOWN_INVALID: usize = 10;

/// A `file:line` citation found in agent output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub file: String,
    /// Saturates at `u64::MAX` for absurdly long digit runs.
    pub line: u64,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Why a reference does not point at real code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalid {
    FileNotFound,
    FileReadError,
    LineExceedsFileLength(u64),
    InvalidLineNumber,
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalid::FileNotFound => f.write_str("file_not_found"),
            Invalid::FileReadError => f.write_str("file_read_error"),
            Invalid::LineExceedsFileLength(lines) => {
                write!(f, "line_exceeds_file_length (file has {} lines)", lines)
            }
            Invalid::InvalidLineNumber => f.write_str("invalid_line_number"),
        }
    }
}

/// Outcome of checking every reference in a piece of text.
#[derive(Debug, Default)]
pub struct Report {
    pub total: usize,
    pub invalid: Vec<(Reference, Invalid)>,
}

impl Report {
    pub fn valid(&self) -> usize {
        self.total - self.invalid.len()
    }

    fn invalid_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.invalid.len() as f64 * 100.0 / self.total as f64
    }

    /// Strictly more than `threshold` percent invalid, in integer arithmetic.
    pub fn exceeds(&self, threshold: u32) -> bool {
        self.invalid.len() as u64 * 100 > u64::from(threshold) * self.total as u64
    }
}

/// Checks agent transcripts for hallucinated code locations.
#[derive(Debug, Clone)]
pub struct ReferenceVerifier {
    threshold: u32,
    max_references: usize,
    max_transcript_bytes: u64,
    transcript_roots: Vec<String>,
    search_dirs: Vec<String>,
}

impl ReferenceVerifier {
    pub fn new(config: &ReferencesConfig) -> Self {
        Self {
            threshold: config.threshold_percent(),
            max_references: config.max_references(),
            max_transcript_bytes: config.max_transcript_bytes(),
            transcript_roots: config.transcript_roots(),
            search_dirs: config.search_dirs(),
        }
    }

    /// Verify the transcript named by a Stop/SubagentStop event.
    ///
    /// Anything that prevents reading the transcript passes without comment.
    pub fn check(&self, input: &HookInput) -> Verdict {
        if input.stop_hook_active {
            tracing::debug!("stop hook already active, skipping");
            return Verdict::pass();
        }
        let Some(path) = input.transcript() else {
            return Verdict::pass();
        };

        let resolved = match transcript::resolve_path(path, &self.transcript_roots) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(path, error = %e, "verify_references: invalid transcript path");
                return Verdict::pass();
            }
        };

        let text = match transcript::load(&resolved, self.max_transcript_bytes) {
            Ok(TranscriptText::Text(text)) => text,
            Ok(TranscriptText::TooLarge { bytes }) => {
                tracing::info!(bytes, "transcript over size ceiling");
                return Verdict::pass_with(
                    "verify_references: Transcript too large, skipping validation",
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "verify_references: unreadable transcript");
                return Verdict::pass();
            }
        };

        let cwd = input
            .cwd
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        self.verify_text(&text, &cwd)
    }

    /// Verify every reference in `text`, resolving relative paths from `cwd`.
    pub fn verify_text(&self, text: &str, cwd: &Path) -> Verdict {
        let references = self.extract(text);
        if references.is_empty() {
            return Verdict::pass();
        }
        let report = self.validate(&references, cwd);
        self.verdict(&report)
    }

    /// Unique references in order of first appearance, capped.
    pub fn extract(&self, text: &str) -> Vec<Reference> {
        let mut seen = HashSet::new();
        let mut references = Vec::new();

        for caps in REFERENCE.captures_iter(text) {
            if references.len() >= self.max_references {
                break;
            }
            let (Some(whole), Some(file), Some(line)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            let next = text[whole.end()..].chars().next();
            if next.is_some_and(|c| !c.is_whitespace() && !TRAILING_DELIMITERS.contains(&c)) {
                continue;
            }

            let token = enclosing_token(text, file.start(), whole.end());
            if token.contains("://") || token.contains("::") {
                continue;
            }
            let file = file.as_str();
            if file.starts_with("node_modules/") {
                continue;
            }

            let reference = Reference {
                file: file.to_string(),
                line: line.as_str().parse().unwrap_or(u64::MAX),
            };
            if seen.insert(reference.clone()) {
                references.push(reference);
            }
        }

        references
    }

    /// Check each reference against the filesystem.
    pub fn validate(&self, references: &[Reference], cwd: &Path) -> Report {
        let mut line_counts: HashMap<PathBuf, Option<u64>> = HashMap::new();
        let mut report = Report {
            total: references.len(),
            invalid: Vec::new(),
        };

        for reference in references {
            let Some(resolved) = self.resolve(&reference.file, cwd) else {
                report.invalid.push((reference.clone(), Invalid::FileNotFound));
                continue;
            };
            let lines = *line_counts
                .entry(resolved)
                .or_insert_with_key(|path| count_lines(path));

            let problem = match lines {
                None => Some(Invalid::FileReadError),
                Some(total) if reference.line > total => {
                    Some(Invalid::LineExceedsFileLength(total))
                }
                Some(_) if reference.line < 1 => Some(Invalid::InvalidLineNumber),
                Some(_) => None,
            };
            if let Some(problem) = problem {
                report.invalid.push((reference.clone(), problem));
            }
        }

        report
    }

    fn resolve(&self, file: &str, cwd: &Path) -> Option<PathBuf> {
        let path = Path::new(file);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        std::iter::once(cwd.to_path_buf())
            .chain(self.search_dirs.iter().map(|dir| cwd.join(dir)))
            .map(|root| root.join(file))
            .find(|candidate| candidate.is_file())
    }

    fn verdict(&self, report: &Report) -> Verdict {
        let invalid = report.invalid.len();
        let percent = report.invalid_percent();

        if report.exceeds(self.threshold) {
            let mut details: Vec<String> = report
                .invalid
                .iter()
                .take(SHOWN_INVALID)
                .map(|(reference, why)| format!("  - {} ({})", reference, why))
                .collect();
            if invalid > SHOWN_INVALID {
                details.push(format!("  ... and {} more", invalid - SHOWN_INVALID));
            }
            let message = format!(
                "Reference verification failed: {:.1}% of file:line references are invalid ({}/{}).\n\
                 Invalid references:\n{}\n\
                 Please verify code locations before referencing them.",
                percent,
                invalid,
                report.total,
                details.join("\n")
            );
            tracing::warn!(invalid, total = report.total, "reference verification failed");
            return Verdict::Block(message);
        }

        if invalid > 0 {
            Verdict::pass_with(format!(
                "Reference verification: {}/{} references valid ({} invalid, {:.1}% - below {}% threshold)",
                report.valid(),
                report.total,
                invalid,
                percent,
                self.threshold
            ))
        } else {
            Verdict::pass_with(format!(
                "Reference verification: All {} file:line references validated successfully",
                report.total
            ))
        }
    }
}

/// The whitespace-delimited token spanning `start..end`.
fn enclosing_token(text: &str, start: usize, end: usize) -> &str {
    let from = text[..start]
        .rfind(char::is_whitespace)
        .map_or(0, |i| i + text[i..].chars().next().map_or(1, char::len_utf8));
    let to = text[end..]
        .find(char::is_whitespace)
        .map_or(text.len(), |i| end + i);
    &text[from..to]
}

/// Newlines plus one for an unterminated last line. `None` if unreadable.
fn count_lines(path: &Path) -> Option<u64> {
    let bytes = fs::read(path).ok()?;
    let newlines = bytes.iter().filter(|b| **b == b'\n').count() as u64;
    let unterminated = bytes.last().is_some_and(|b| *b != b'\n');
    Some(newlines + u64::from(unterminated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn verifier() -> ReferenceVerifier {
        ReferenceVerifier::new(&ReferencesConfig::default())
    }

    fn refs(text: &str) -> Vec<String> {
        verifier().extract(text).iter().map(|r| r.to_string()).collect()
    }

    fn project(files: &[(&str, usize)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, lines) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "x\n".repeat(*lines)).unwrap();
        }
        dir
    }

    #[test]
    fn test_extract_forms() {
        assert_eq!(
            refs("See src/main.rs:10, (lib.rs:2) and `/abs/file.py:7`."),
            vec!["src/main.rs:10", "lib.rs:2", "/abs/file.py:7"]
        );
    }

    #[test]
    fn test_extract_adjacent_references() {
        assert_eq!(refs("a.rs:1 b.rs:2 c.rs:3"), vec!["a.rs:1", "b.rs:2", "c.rs:3"]);
        assert_eq!(refs("a.rs:1,b.rs:2"), vec!["a.rs:1"]);
    }

    #[test]
    fn test_extract_skips_noise() {
        assert!(refs("node_modules/react/index.js:3").is_empty());
        assert!(refs("visit http://host/x.rs:80/").is_empty());
        assert!(refs("std::fs.rs:1 foo.rs:12abc").is_empty());
    }

    #[test]
    fn test_extract_dedups_and_caps() {
        assert_eq!(refs("a.rs:1 a.rs:1 a.rs:2"), vec!["a.rs:1", "a.rs:2"]);
        let config = ReferencesConfig {
            max_references: Some(2),
            ..Default::default()
        };
        let verifier = ReferenceVerifier::new(&config);
        assert_eq!(verifier.extract("a.rs:1 b.rs:2 c.rs:3").len(), 2);
    }

    #[test]
    fn test_line_count_and_reasons() {
        let dir = project(&[("src/app.ts", 50)]);
        fs::write(dir.path().join("partial.txt"), "one\ntwo").unwrap();
        let verifier = verifier();
        let references = verifier.extract("app.ts:50 src/app.ts:51 partial.txt:2 missing.rs:1 app.ts:0");
        let report = verifier.validate(&references, dir.path());
        let reasons: Vec<String> = report
            .invalid
            .iter()
            .map(|(r, why)| format!("{} {}", r, why))
            .collect();
        assert_eq!(
            reasons,
            vec![
                "src/app.ts:51 line_exceeds_file_length (file has 50 lines)",
                "missing.rs:1 file_not_found",
                "app.ts:0 invalid_line_number",
            ]
        );
        assert_eq!(report.valid(), 2);
    }

    #[test]
    fn test_single_bad_reference_blocks() {
        let dir = project(&[("src/app.ts", 50)]);
        let verdict = verifier().verify_text("Look at src/app.ts:999999", dir.path());
        let Verdict::Block(message) = verdict else {
            panic!("expected block");
        };
        assert!(message.starts_with(
            "Reference verification failed: 100.0% of file:line references are invalid (1/1)."
        ));
        assert!(message.contains("  - src/app.ts:999999 (line_exceeds_file_length (file has 50 lines))"));
        assert!(message.ends_with("Please verify code locations before referencing them."));
    }

    #[test]
    fn test_no_references_pass() {
        let dir = project(&[]);
        assert_eq!(verifier().verify_text("nothing to see", dir.path()), Verdict::pass());
    }

    #[test]
    fn test_threshold_is_strict() {
        let dir = project(&[("a.rs", 5), ("b.rs", 2)]);

        // 3 of 10 invalid is exactly 30%
        let text = "a.rs:1 a.rs:2 a.rs:3 a.rs:4 a.rs:5 b.rs:1 b.rs:2 c.rs:1 d.rs:1 e.rs:1";
        let Verdict::Pass(Some(message)) = verifier().verify_text(text, dir.path()) else {
            panic!("expected pass");
        };
        assert_eq!(
            message,
            "Reference verification: 7/10 references valid (3 invalid, 30.0% - below 30% threshold)"
        );

        // 3 of 9 is over
        let text = "a.rs:1 a.rs:2 a.rs:3 a.rs:4 a.rs:5 b.rs:1 c.rs:1 d.rs:1 e.rs:1";
        assert!(verifier().verify_text(text, dir.path()).is_blocked());
    }

    #[test]
    fn test_all_valid_summary() {
        let dir = project(&[("a.rs", 5)]);
        assert_eq!(
            verifier().verify_text("a.rs:1 and a.rs:5", dir.path()),
            Verdict::pass_with("Reference verification: All 2 file:line references validated successfully")
        );
    }

    #[test]
    fn test_report_exceeds() {
        let report = Report {
            total: 10,
            invalid: (0..3)
                .map(|i| {
                    (
                        Reference {
                            file: format!("f{}.rs", i),
                            line: 1,
                        },
                        Invalid::FileNotFound,
                    )
                })
                .collect(),
        };
        assert!(!report.exceeds(30));
        assert!(report.exceeds(29));
    }

    #[test]
    fn test_block_message_truncates_list() {
        let dir = project(&[]);
        let text: Vec<String> = (1..=12).map(|i| format!("m{}.rs:1", i)).collect();
        let Verdict::Block(message) = verifier().verify_text(&text.join(" "), dir.path()) else {
            panic!("expected block");
        };
        assert!(message.contains("  ... and 2 more"));
        assert!(!message.contains("m11.rs"));
    }

    #[test]
    fn test_stop_hook_active_passes() {
        let input = HookInput::parse(
            r#"{"hook_event_name":"SubagentStop","stop_hook_active":true,"transcript_path":"/nope"}"#,
        )
        .unwrap();
        assert_eq!(verifier().check(&input), Verdict::pass());
    }
}
