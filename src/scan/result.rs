//! Decoded scan results.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A decoded QR payload.
///
/// Produced at most once per scan cycle. Two results never compare equal
/// across cycles because `cycle` increases monotonically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedResult {
    text: String,
    captured_at: DateTime<Utc>,
    cycle: u64,
}

impl DecodedResult {
    /// Stamps `text` with the current time.
    pub fn new(text: impl Into<String>, cycle: u64) -> Self {
        Self {
            text: text.into(),
            captured_at: Utc::now(),
            cycle,
        }
    }

    /// Decoded payload.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the payload was decoded.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Scan cycle that produced this result.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Consumes the result, returning the payload.
    pub fn into_text(self) -> String {
        self.text
    }

    /// The payload, if it is an absolute `http` or `https` URL.
    pub fn link(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.chars().any(char::is_whitespace) {
            return None;
        }
        let (scheme, rest) = text.split_once("://")?;
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return None;
        }
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        };
        if host.is_empty() {
            return None;
        }
        Some(text)
    }
}

impl std::fmt::Display for DecodedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
