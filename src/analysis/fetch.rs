//! WebFetch/WebSearch analysis: SSRF, injection and credential leak checks.

use url::Url;

use crate::config::{ConfigError, DEFAULT_MAX_URL_LENGTH, UrlsConfig};
use crate::decision::{BlockInfo, Decision};
use crate::input::HookInput;
use crate::net::{classify, normalize_host, raw_host};
use crate::rules::RuleTable;
use crate::rules::urls::{
    ALLOWED_SCHEMES, INJECTION_MARKERS, INTERNAL_HOSTNAMES, INTERNAL_SUFFIXES, SENSITIVE_PARAMS,
};

const REASON_PREFIX: &str = "External content validation failed: ";

/// Validates outbound URLs without resolving or fetching them.
#[derive(Debug)]
pub struct UrlValidator {
    max_length: usize,
    allow_domains: Vec<String>,
    deny_domains: Vec<String>,
    sensitive_params: RuleTable,
}

/// A failed check: the rule that fired and the message shown to the user.
type Failure = (&'static str, String);

impl UrlValidator {
    pub fn new(config: &UrlsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_length: config.max_url_length.unwrap_or(DEFAULT_MAX_URL_LENGTH),
            allow_domains: normalize_domains(&config.allow_domains),
            deny_domains: normalize_domains(&config.deny_domains),
            sensitive_params: RuleTable::compile(SENSITIVE_PARAMS, true)?,
        })
    }

    /// Check the URL carried by a WebFetch or WebSearch call.
    pub fn check(&self, input: &HookInput) -> Decision {
        match input.url() {
            Some(url) => self.check_url(url),
            None => Decision::allow(),
        }
    }

    /// Check a single URL. Empty URLs are allowed.
    pub fn check_url(&self, url: &str) -> Decision {
        if url.is_empty() {
            return Decision::allow();
        }
        match self.validate(url) {
            Ok(()) => Decision::allow(),
            Err((rule, message)) => {
                tracing::debug!(rule, %message, "url rejected");
                Decision::Block(BlockInfo::new(rule, format!("{}{}", REASON_PREFIX, message)))
            }
        }
    }

    fn validate(&self, url: &str) -> Result<(), Failure> {
        if url.chars().count() > self.max_length {
            return Err((
                "urls.length",
                format!("URL exceeds maximum length ({} chars)", self.max_length),
            ));
        }

        let lowered = url.to_lowercase();
        if let Some(marker) = INJECTION_MARKERS.iter().find(|m| lowered.contains(**m)) {
            return Err((
                "urls.injection",
                format!("Suspicious pattern detected in URL: {}", marker),
            ));
        }

        let parsed =
            Url::parse(url).map_err(|e| ("urls.invalid", format!("Invalid URL format: {}", e)))?;
        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return Err((
                "urls.scheme",
                format!("Unsupported URL scheme: {}", parsed.scheme()),
            ));
        }

        // The fetcher sees the decoded host, the agent wrote the raw one
        let decoded = parsed.host_str().unwrap_or_default();
        let written = raw_host(url).unwrap_or(decoded);
        check_host(written, written)?;
        if decoded != written {
            check_host(written, decoded)?;
        }
        self.check_domain_lists(&parsed)?;
        self.check_params(&parsed)
    }

    fn check_domain_lists(&self, parsed: &Url) -> Result<(), Failure> {
        let Some(host) = parsed.host_str() else {
            return Ok(());
        };
        let host = host.trim_end_matches('.').to_lowercase();

        if let Some(entry) = self.deny_domains.iter().find(|d| domain_matches(&host, d)) {
            return Err((
                "urls.deny_domain",
                format!("Domain is deny-listed: {} (matches {})", host, entry),
            ));
        }
        if !self.allow_domains.is_empty()
            && !self.allow_domains.iter().any(|d| domain_matches(&host, d))
        {
            return Err((
                "urls.allow_domain",
                format!("Domain is not in the allow-list: {}", host),
            ));
        }
        Ok(())
    }

    fn check_params(&self, parsed: &Url) -> Result<(), Failure> {
        for (name, _) in parsed.query_pairs() {
            if self.sensitive_params.first_match(&name).is_some() {
                return Err((
                    "urls.sensitive_param",
                    format!("Sensitive parameter detected in URL: {}", name),
                ));
            }
        }
        Ok(())
    }
}

/// Reject hosts that point into a private network.
///
/// `host` is classified; `written` is the host text quoted in the reason.
fn check_host(written: &str, host: &str) -> Result<(), Failure> {
    if host.is_empty() {
        return Ok(());
    }

    if let Some(ip) = normalize_host(host) {
        if let Some(class) = classify(ip) {
            let shown = written.trim_start_matches('[').trim_end_matches(']');
            let message = if shown.eq_ignore_ascii_case(&ip.to_string()) {
                format!("{} blocked: {}", class, shown)
            } else {
                format!("{} blocked: {} (resolved to {})", class, shown, ip)
            };
            return Err(("urls.ssrf", message));
        }
        return Ok(());
    }

    let name = host.trim_end_matches('.').to_lowercase();
    if INTERNAL_HOSTNAMES.contains(&name.as_str())
        || INTERNAL_SUFFIXES.iter().any(|s| name.ends_with(s))
    {
        let message = if written == host {
            format!("Internal/private network host blocked: {}", written)
        } else {
            format!("Internal/private network host blocked: {} (decoded as {})", written, name)
        };
        return Err(("urls.ssrf", message));
    }
    Ok(())
}

fn normalize_domains(domains: &[String]) -> Vec<String> {
    domains
        .iter()
        .map(|d| d.trim().trim_start_matches('.').to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Exact match or subdomain of `domain`.
fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn validator() -> UrlValidator {
        UrlValidator::new(&UrlsConfig::default()).unwrap()
    }

    fn reason(url: &str) -> Option<String> {
        validator()
            .check_url(url)
            .block_info()
            .map(|info| info.reason.clone())
    }

    #[test]
    fn test_metadata_endpoint_blocked() {
        assert_eq!(
            reason("http://169.254.169.254/latest/meta-data/").unwrap(),
            "External content validation failed: Cloud metadata endpoint blocked: 169.254.169.254"
        );
    }

    #[test]
    fn test_public_ip_allowed() {
        assert!(reason("http://8.8.8.8/").is_none());
        assert!(reason("https://docs.rs/regex/latest/regex/").is_none());
    }

    #[test]
    fn test_obfuscated_loopback_names_original() {
        let message = reason("http://2130706433/admin").unwrap();
        assert!(message.contains("Loopback address blocked: 2130706433 (resolved to 127.0.0.1)"));
        assert!(reason("http://0x7f.0.0.1/").is_some());
        assert!(reason("http://0177.0.0.1/").is_some());
        assert!(reason("http://[::ffff:127.0.0.1]/").is_some());
    }

    #[test]
    fn test_internal_hostnames() {
        for url in [
            "http://localhost:8080/",
            "http://api.localhost/",
            "http://printer.local/",
            "http://metadata.google.internal/computeMetadata/v1/",
        ] {
            assert!(reason(url).unwrap().contains("Internal/private network host blocked"), "{url}");
        }
    }

    #[test]
    fn test_encoded_internal_hostnames() {
        assert_eq!(
            reason("http://localhos%74/admin").unwrap(),
            "External content validation failed: Internal/private network host blocked: \
             localhos%74 (decoded as localhost)"
        );
        for url in [
            "http://\u{ff4c}\u{ff4f}\u{ff43}\u{ff41}\u{ff4c}\u{ff48}\u{ff4f}\u{ff53}\u{ff54}/",
            "http://metadata.google.interna%6c/computeMetadata/v1/",
        ] {
            assert!(reason(url).unwrap().contains("Internal/private network host blocked"), "{url}");
        }
    }

    #[test]
    fn test_ipv4_compatible_ipv6_blocked() {
        for url in ["http://[::127.0.0.1]/", "http://[::7f00:1]/"] {
            assert!(reason(url).unwrap().contains("Loopback"), "{url}");
        }
        assert!(reason("http://[::1:0:0:1]/").unwrap().contains("Reserved address"));
    }

    #[test]
    fn test_sensitive_param() {
        let message = reason("http://example.com/?api_key=xyz").unwrap();
        assert!(message.ends_with("Sensitive parameter detected in URL: api_key"));
        assert!(reason("http://example.com/?Session-ID=").is_some());
        assert!(reason("http://example.com/?q=token").is_none());
    }

    #[test]
    fn test_length_limit() {
        let url = format!("https://example.com/{}", "a".repeat(3000));
        assert!(reason(&url).unwrap().contains("maximum length (2048 chars)"));
    }

    #[test]
    fn test_injection_and_scheme() {
        assert!(reason("https://example.com/<script>").unwrap().contains("<script"));
        assert!(reason("https://example.com/a/../../etc").unwrap().contains("../"));
        assert!(reason("ftp://example.com/pub").unwrap().contains("Unsupported URL scheme: ftp"));
        assert!(reason("file:///etc/passwd").is_some());
    }

    #[test]
    fn test_domain_lists() {
        let config = Config::from_toml(
            "[urls]\nallow_domains = [\"example.com\"]\ndeny_domains = [\"bad.example.com\"]",
        )
        .unwrap();
        let validator = UrlValidator::new(&config.urls).unwrap();
        assert!(!validator.check_url("https://www.example.com/").is_blocked());
        assert!(validator.check_url("https://bad.example.com/").is_blocked());
        assert!(validator.check_url("https://sub.bad.example.com/").is_blocked());
        assert!(validator.check_url("https://notexample.com/").is_blocked());
        assert!(validator.check_url("https://example.org/").is_blocked());
    }

    #[test]
    fn test_non_url_search_allowed() {
        let input = HookInput::parse(
            r#"{"tool_name":"WebSearch","tool_input":{"query":"rust ssrf localhost"}}"#,
        )
        .unwrap();
        assert_eq!(validator().check(&input), Decision::Allow);
    }
}
