//! API key handling
//!
//! Provider API keys come from the process environment and are wrapped in
//! [`SecretString`] as soon as they are read, so they never reach logs through
//! `Debug` or `Display`. [`scrub_secrets`] removes key-shaped substrings from
//! upstream error bodies before they are logged or wrapped in errors.

use regex::Regex;
use sdk::errors::AppError;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Environment variable holding the completion API key
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable holding the email API key
pub const EMAIL_API_KEY: &str = "EMAIL_API_KEY";

/// A wrapper for sensitive string data that prevents accidental logging.
///
/// `Debug` and `Display` always print `[REDACTED]`; use `expose()` to get the
/// value when building a request header.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Source of API keys.
///
/// `from_env` reads the process environment on each lookup; `from_values`
/// pins a fixed set of keys, which is what tests and the CLI `doctor`
/// command use.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    fixed: Option<HashMap<String, SecretString>>,
}

impl SecretStore {
    pub fn from_env() -> Self {
        Self { fixed: None }
    }

    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fixed = values
            .into_iter()
            .map(|(k, v)| (k.into(), SecretString::new(v)))
            .collect();
        Self { fixed: Some(fixed) }
    }

    /// Look up a key. Empty values count as missing.
    pub fn get(&self, key: &str) -> Result<SecretString, AppError> {
        let value = match &self.fixed {
            Some(map) => map.get(key).cloned(),
            None => std::env::var(key).ok().map(SecretString::new),
        };

        value
            .filter(|v| !v.expose().trim().is_empty())
            .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }
}

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9-_]{20,}
/// - Resend API keys: re_[a-zA-Z0-9_]{16,}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"sk-[a-zA-Z0-9\-_]{20,}").expect("Invalid OpenAI pattern"),
            Regex::new(r"re_[a-zA-Z0-9_]{16,}").expect("Invalid Resend pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Replace every detected secret in `text` with `[REDACTED]`.
///
/// ```
/// use subtrack_engine::secrets::scrub_secrets;
///
/// let scrubbed = scrub_secrets("Incorrect API key provided: sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "Incorrect API key provided: [REDACTED]");
/// ```
pub fn scrub_secrets(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}
