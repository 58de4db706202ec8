//! Session token issuance.
//!
//! Issuing is pure string construction plus a clock read: no network call,
//! no persistence. The only durable trace of a token is the `session` column
//! of the events recorded against it later.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::ids::SessionId;

/// A freshly issued session id and the link that carries it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    pub session: SessionId,
    pub base_url: String,
    pub visit_url: String,
}

/// Where the base URL of an issued link came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseSource {
    Custom,
    Configured,
    Fallback,
}

impl BaseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Configured => "configured",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TokenIssuer {
    configured_base: Option<String>,
    fallback_base: String,
}

impl TokenIssuer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            configured_base: settings.public_base_url.clone(),
            fallback_base: settings.fallback_base_url(),
        }
    }

    /// Issue a token using the current time.
    pub fn issue(&self, override_base: Option<&str>) -> SessionToken {
        self.issue_at(Utc::now(), override_base)
    }

    /// Issue a token for a given instant.
    pub fn issue_at(&self, now: DateTime<Utc>, override_base: Option<&str>) -> SessionToken {
        let session = SessionId::from_clock(now);
        let (base_url, source) = self.resolve_base(override_base);
        let visit_url = format!("{base_url}/visit?s={session}");

        info!(session_id = %session, source = source.as_str(), base = %base_url, "issued session token");

        SessionToken {
            session,
            base_url,
            visit_url,
        }
    }

    /// Pick the base URL: override, then configured, then local fallback.
    pub fn resolve_base(&self, override_base: Option<&str>) -> (String, BaseSource) {
        if let Some(custom) = override_base.and_then(normalize_base_url) {
            return (custom, BaseSource::Custom);
        }
        if let Some(configured) = self.configured_base.as_deref().filter(|b| !b.is_empty()) {
            return (configured.trim_end_matches('/').to_string(), BaseSource::Configured);
        }
        (self.fallback_base.clone(), BaseSource::Fallback)
    }
}

/// Normalize an operator-supplied base URL.
///
/// Returns `None` when the input is blank. Percent-escapes are decoded once,
/// `https://` is assumed when no `http(s)` scheme is present, and trailing
/// slashes are removed.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(trimmed).decode_utf8_lossy();
    let decoded = decoded.trim();

    let with_scheme = if decoded.starts_with("http://") || decoded.starts_with("https://") {
        decoded.to_string()
    } else {
        format!("https://{decoded}")
    };

    let normalized = with_scheme.trim_end_matches('/').to_string();
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_fixed() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn issuer(public: Option<&str>) -> TokenIssuer {
        let mut settings = Settings::default();
        if let Some(p) = public {
            settings.set_public_base_url(p);
        }
        TokenIssuer::new(&settings)
    }

    #[test]
    fn fallback_when_nothing_configured() {
        let token = issuer(None).issue_at(at_fixed(), None);
        assert_eq!(token.session.as_str(), "1700000000000");
        assert_eq!(token.base_url, "http://127.0.0.1:5000");
        assert_eq!(token.visit_url, "http://127.0.0.1:5000/visit?s=1700000000000");
    }

    #[test]
    fn configured_base_beats_fallback() {
        let token = issuer(Some("https://links.example.com/")).issue_at(at_fixed(), None);
        assert_eq!(
            token.visit_url,
            "https://links.example.com/visit?s=1700000000000"
        );
    }

    #[test]
    fn override_beats_configured() {
        let token = issuer(Some("https://links.example.com"))
            .issue_at(at_fixed(), Some("demo.example.org/"));
        assert_eq!(token.base_url, "https://demo.example.org");
        assert_eq!(token.visit_url, "https://demo.example.org/visit?s=1700000000000");
    }

    #[test]
    fn blank_override_is_ignored() {
        let iss = issuer(Some("https://links.example.com"));
        let (base, source) = iss.resolve_base(Some("   "));
        assert_eq!(base, "https://links.example.com");
        assert_eq!(source, BaseSource::Configured);
    }

    #[test]
    fn resolve_reports_source() {
        let iss = issuer(None);
        assert_eq!(iss.resolve_base(None).1, BaseSource::Fallback);
        assert_eq!(iss.resolve_base(Some("x.test")).1, BaseSource::Custom);
    }

    #[test]
    fn normalize_keeps_existing_scheme() {
        assert_eq!(
            normalize_base_url("http://10.0.0.5:8080/").as_deref(),
            Some("http://10.0.0.5:8080")
        );
        assert_eq!(
            normalize_base_url("https://a.test").as_deref(),
            Some("https://a.test")
        );
    }

    #[test]
    fn normalize_defaults_to_https() {
        assert_eq!(normalize_base_url("a.test").as_deref(), Some("https://a.test"));
    }

    #[test]
    fn normalize_strips_all_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://a.test///").as_deref(),
            Some("https://a.test")
        );
    }

    #[test]
    fn normalize_decodes_percent_escapes() {
        assert_eq!(
            normalize_base_url("https%3A%2F%2Fa.test%2F").as_deref(),
            Some("https://a.test")
        );
    }

    #[test]
    fn normalize_blank_is_none() {
        assert!(normalize_base_url("").is_none());
        assert!(normalize_base_url("  \t").is_none());
    }
}
