//! Credentials for the Cascade web services.
//!
//! The password lives in a [`SecureString`], zeroized on drop and redacted in
//! `Debug`/`Display`. [`Credentials`] derives both wire encodings from the same
//! pair: the `u`/`p` query parameters and the `Basic base64(user:pass)` header.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string whose memory is cleared when dropped.
///
/// # Example
///
/// ```
/// use cws_connectors::SecureString;
///
/// let secret = SecureString::new("hunter2".to_string());
/// assert_eq!(secret.expose_secret(), "hunter2");
/// assert_eq!(format!("{}", secret), "[REDACTED]");
/// ```
#[derive(Clone, Default)]
pub struct SecureString(Zeroizing<String>);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(Zeroizing::new(s))
    }

    /// Borrows the secret. Copies made from it are not zeroized.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for SecureString {}

impl Serialize for SecureString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecureString::new)
    }
}

/// Username/password pair used by both transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: SecureString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecureString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Query parameters carrying the credentials on the HTTP+JSON transport.
    pub fn query_pairs(&self) -> [(&'static str, &str); 2] {
        [
            ("u", self.username.as_str()),
            ("p", self.password.expose_secret()),
        ]
    }

    /// `Authorization` header value derived from the same query parameters.
    pub fn basic_header(&self) -> SecureString {
        let [(_, user), (_, pass)] = self.query_pairs();
        let encoded = BASE64.encode(format!("{}:{}", user, pass));
        SecureString::new(format!("Basic {}", encoded))
    }

    /// The `authentication` member of an RPC envelope.
    pub fn rpc_authentication(&self) -> serde_json::Value {
        serde_json::json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_redacted() {
        let secret = SecureString::from("super-secret");
        assert!(!format!("{:?}", secret).contains("super-secret"));
        assert!(!format!("{}", secret).contains("super-secret"));
        assert_eq!(secret.expose_secret(), "super-secret");
    }

    #[test]
    fn test_secure_string_equality() {
        assert_eq!(SecureString::from("a"), SecureString::from("a".to_string()));
        assert_ne!(SecureString::from("a"), SecureString::from("b"));
        assert!(SecureString::default().is_empty());
    }

    #[test]
    fn test_basic_header() {
        let creds = Credentials::new("admin", "admin");
        // base64("admin:admin")
        assert_eq!(creds.basic_header().expose_secret(), "Basic YWRtaW46YWRtaW4=");
    }

    #[test]
    fn test_query_pairs() {
        let creds = Credentials::new("wing", "pa ss");
        assert_eq!(creds.query_pairs(), [("u", "wing"), ("p", "pa ss")]);
    }

    #[test]
    fn test_rpc_authentication() {
        let creds = Credentials::new("wing", "pw");
        assert_eq!(
            creds.rpc_authentication(),
            serde_json::json!({"username": "wing", "password": "pw"})
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("wing", "topsecret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("wing"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_deserialize() {
        let creds: Credentials =
            serde_json::from_str(r#"{"username":"u1","password":"p1"}"#).unwrap();
        assert_eq!(creds.password.expose_secret(), "p1");
    }
}
