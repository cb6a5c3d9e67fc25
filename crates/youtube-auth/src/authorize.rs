//! Consent URL construction and CSRF state tokens
//!
//! The state token is generated once per login attempt, embedded in the
//! consent URL, and compared by the loopback listener against the `state`
//! query parameter the provider echoes back. It never leaves memory.

use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use url::Url;

use crate::client_secret::OAuthConfig;

/// Generate an unpredictable CSRF state token.
///
/// 32 random bytes encoded as URL-safe base64 without padding (43 chars),
/// safe to place in a query string unescaped.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the consent URL for `state`.
///
/// Requests offline access so the first consent issues a refresh token.
/// Deterministic for a given configuration and state; no I/O.
pub fn build_authorization_url(config: &OAuthConfig, state: &str) -> Url {
    let mut url = config.auth_uri.clone();
    url.query_pairs_mut()
        .append_pair("access_type", "offline")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", state);
    url
}

/// Redirect URI the provider should send the browser back to.
///
/// Always uses `localhost` as the host so it matches the loopback redirect
/// Google registers for desktop clients, whatever interface the listener
/// binds. A root path is left off.
pub fn loopback_redirect_uri(addr: SocketAddr, path: &str) -> String {
    if path.is_empty() || path == "/" {
        format!("http://localhost:{}", addr.port())
    } else {
        format!("http://localhost:{}{}", addr.port(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::config_for;
    use std::collections::HashMap;

    #[test]
    fn state_is_url_safe_base64() {
        let state = generate_state();
        // 32 bytes → 43 base64url chars (no padding)
        assert_eq!(state.len(), 43);
        assert!(
            state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state must be URL-safe base64 (no padding): {state}"
        );
    }

    #[test]
    fn states_are_unique() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b, "two state tokens must not collide");
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let config = config_for("https://accounts.example.test");
        let url = build_authorization_url(&config, "expected123");

        assert!(url.as_str().starts_with("https://accounts.example.test/auth?"));
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["client_id"], "test-client");
        assert_eq!(query["redirect_uri"], "http://localhost:8080");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], "https://www.googleapis.com/auth/youtube");
        assert_eq!(query["state"], "expected123");
    }

    #[test]
    fn authorization_url_is_deterministic_and_encoded() {
        let mut config = config_for("https://accounts.example.test");
        config.scopes.push("openid email".into());

        let a = build_authorization_url(&config, "s t&x");
        let b = build_authorization_url(&config, "s t&x");
        assert_eq!(a, b);

        let raw = a.as_str();
        assert!(!raw.contains("s t&x"), "state must be percent-encoded: {raw}");
        let state = a
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        assert_eq!(state.as_deref(), Some("s t&x"));
    }

    #[test]
    fn loopback_redirect_uri_uses_localhost_and_port() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(loopback_redirect_uri(addr, "/"), "http://localhost:8080");
        assert_eq!(
            loopback_redirect_uri(addr, "/oauth/callback"),
            "http://localhost:8080/oauth/callback"
        );
    }
}
