//! Secret wrapper for sensitive values

use std::fmt;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Lets descriptor structs (e.g. the OAuth client secret file) hold the
/// sensitive field as a `Secret` directly.
impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Secret::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacts_debug() {
        let secret = Secret::new(String::from("GOCSPX-client-secret"));
        let debug = format!("{:?}", secret);
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("GOCSPX"));
    }

    #[test]
    fn test_secret_exposes_value() {
        let secret = Secret::new(String::from("GOCSPX-client-secret"));
        assert_eq!(secret.expose(), "GOCSPX-client-secret");
    }

    #[test]
    fn test_secret_deserializes_transparently() {
        #[derive(Deserialize)]
        struct Descriptor {
            client_secret: Secret<String>,
        }

        let d: Descriptor = serde_json::from_str(r#"{"client_secret":"s3cr3t"}"#).unwrap();
        assert_eq!(d.client_secret.expose(), "s3cr3t");
        assert_eq!(d.client_secret.to_string(), "[REDACTED]");
    }
}
