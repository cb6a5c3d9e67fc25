//! Google OAuth authentication for the YouTube Data API
//!
//! Implements the installed-app authorization-code flow with a loopback
//! redirect, plus the single-slot credential lifecycle that backs every
//! authenticated API call. No dependency on the CLI binary; everything here
//! can be driven and tested on its own.
//!
//! Credential flow:
//! 1. `OAuthConfig::from_client_secret_file()` reads the provider descriptor
//! 2. `LoginFlow::run()` mints a state token and builds the consent URL
//! 3. `callback::listen_and_serve()` waits for the browser redirect
//! 4. `AuthService::exchange_code()` trades the code for tokens and persists them
//! 5. `AuthService::authenticated_client()` refreshes through `Refresher` on every call
//! 6. `AuthService::logout()` revokes upstream and deletes the local credential

pub mod authorize;
pub mod callback;
pub mod client_secret;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod login;
pub mod refresh;
pub mod service;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorize::{build_authorization_url, generate_state, loopback_redirect_uri};
pub use callback::{CallbackPhase, CallbackResult, CallbackServer, listen_and_serve};
pub use client_secret::OAuthConfig;
pub use constants::*;
pub use credentials::{Credential, CredentialStore};
pub use error::{CallbackError, Error, Result};
pub use login::{LoginFlow, LoginOptions, LoginPrompt};
pub use refresh::Refresher;
pub use service::{AuthService, AuthenticatedClient};
pub use token::{TokenResponse, exchange_code, refresh_token, revoke_token};
