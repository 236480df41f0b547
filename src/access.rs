//! Origin gate and CORS header shaping.
//!
//! The gate is a pure predicate over the request's `Origin` header and the domain the
//! deployment is serving on. It runs before any credential is requested so rejected
//! callers never cost an upstream round trip.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AccessPolicy {
    /// Exact origins (scheme + host + optional port) allowed to read responses.
    pub allowed_origins: BTreeSet<String>,
    /// Domain whose origin-less calls (same-origin tooling, consoles) are accepted.
    pub staging_domain: Option<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(allowed_origins: I, staging_domain: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { allowed_origins: allowed_origins.into_iter().map(Into::into).collect(), staging_domain }
    }

    pub fn is_allowed(&self, origin: Option<&str>, domain_name: &str) -> bool {
        match origin {
            None => self.staging_domain.as_deref().is_some_and(|staging| staging == domain_name),
            Some(origin) => self.allowed_origins.contains(origin),
        }
    }

    pub fn check(&self, origin: Option<&str>, domain_name: &str) -> AppResult<()> {
        if self.is_allowed(origin, domain_name) { Ok(()) } else { Err(AppError::access_denied()) }
    }
}

/// Look up the `Origin` header regardless of the casing the trigger delivered it in.
/// An empty value counts as absent.
pub fn origin_header(headers: &BTreeMap<String, String>) -> Option<&str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("origin"))
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Headers every response to an admitted caller carries.
pub fn cors_headers(origin: Option<&str>) -> BTreeMap<String, String> {
    let mut h = BTreeMap::new();
    if let Some(origin) = origin {
        h.insert(ALLOW_ORIGIN.to_string(), origin.to_string());
    }
    h.insert(ALLOW_CREDENTIALS.to_string(), "true".to_string());
    h
}

pub fn preflight_headers(origin: Option<&str>) -> BTreeMap<String, String> {
    let mut h = cors_headers(origin);
    h.insert(ALLOW_METHODS.to_string(), "GET, OPTIONS".to_string());
    h.insert(ALLOW_HEADERS.to_string(), "Content-Type".to_string());
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::new(["https://blog.example.com"], Some("staging-api.example.com".into()))
    }

    #[test]
    fn missing_origin_only_on_staging() {
        let p = policy();
        assert!(p.is_allowed(None, "staging-api.example.com"));
        assert!(!p.is_allowed(None, "api.example.com"));
        assert_eq!(p.check(None, "api.example.com").unwrap_err().http_status(), 401);
    }

    #[test]
    fn missing_origin_rejected_without_staging_domain() {
        let p = AccessPolicy::new(["https://blog.example.com"], None);
        assert!(!p.is_allowed(None, ""));
    }

    #[test]
    fn present_origin_must_be_listed() {
        let p = policy();
        assert!(p.is_allowed(Some("https://blog.example.com"), "api.example.com"));
        assert!(!p.is_allowed(Some("https://evil.example.com"), "api.example.com"));
        // staging does not rescue an unlisted origin
        assert!(!p.is_allowed(Some("https://evil.example.com"), "staging-api.example.com"));
    }

    #[test]
    fn origin_header_is_case_insensitive_and_ignores_empty() {
        let mut h = BTreeMap::new();
        h.insert("Origin".to_string(), "https://a".to_string());
        assert_eq!(origin_header(&h), Some("https://a"));

        let mut h = BTreeMap::new();
        h.insert("origin".to_string(), "".to_string());
        assert_eq!(origin_header(&h), None);
    }

    #[test]
    fn cors_headers_echo_origin() {
        let h = cors_headers(Some("https://blog.example.com"));
        assert_eq!(h.get(ALLOW_ORIGIN).map(String::as_str), Some("https://blog.example.com"));
        assert_eq!(h.get(ALLOW_CREDENTIALS).map(String::as_str), Some("true"));
        assert!(!cors_headers(None).contains_key(ALLOW_ORIGIN));
        assert!(preflight_headers(None).contains_key(ALLOW_METHODS));
    }
}
