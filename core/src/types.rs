//! Plain-data option types carried by a `RequestConfig`.
//!
//! # Design
//! These are the serde-facing pieces of a request description. Callback
//! hooks (progress, status validation) are not data and live in `config`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials sent as an `Authorization: Basic ...` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs and panic messages.
impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_deserializes_from_json() {
        let auth: BasicAuth =
            serde_json::from_str(r#"{"username":"ada","password":"secret"}"#).unwrap();
        assert_eq!(auth, BasicAuth::new("ada", "secret"));
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", BasicAuth::new("ada", "secret"));
        assert!(rendered.contains("ada"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn basic_auth_rejects_missing_password() {
        let result: Result<BasicAuth, _> = serde_json::from_str(r#"{"username":"ada"}"#);
        assert!(result.is_err());
    }
}
