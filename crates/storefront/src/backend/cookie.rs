//! The backend's authentication cookie, relayed on behalf of the shopper.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use serde::{Deserialize, Serialize};

/// Cookie pairs issued by the backend auth service.
///
/// Holds the `name=value` pairs from every `Set-Cookie` header, joined with
/// `"; "` so the value can be sent back verbatim in a `Cookie` header.
/// Attributes (`Path`, `HttpOnly`, `Max-Age`...) are dropped. `Debug` is
/// redacted because the value is a bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendCookie(String);

impl BackendCookie {
    /// Wrap an already-joined `name=value` list.
    #[must_use]
    pub fn new(pairs: impl Into<String>) -> Self {
        Self(pairs.into())
    }

    /// Capture the cookies set by a backend response, if any.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let pairs: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('=') && !pair.starts_with('='))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(Self(pairs.join("; ")))
        }
    }

    /// Value for an outgoing `Cookie` header.
    #[must_use]
    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Debug for BackendCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackendCookie([REDACTED])")
    }
}
