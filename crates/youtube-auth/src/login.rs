//! Interactive login: consent URL, loopback callback, code exchange

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::authorize::{build_authorization_url, generate_state, loopback_redirect_uri};
use crate::callback::{CallbackResult, listen_and_serve};
use crate::constants::{DEFAULT_CALLBACK_ADDR, DEFAULT_CALLBACK_PATH, DEFAULT_LOGIN_TIMEOUT};
use crate::credentials::Credential;
use crate::error::{CallbackError, Error, Result};
use crate::service::AuthService;

#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Where the loopback listener binds; port 0 picks a free port
    pub callback_addr: SocketAddr,
    pub callback_path: String,
    /// How long to wait for the browser to come back
    pub timeout: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            callback_addr: DEFAULT_CALLBACK_ADDR,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }
}

/// What the user needs to finish a login in their browser.
#[derive(Debug, Clone)]
pub struct LoginPrompt {
    pub authorization_url: Url,
    /// Redirect target the listener is waiting on
    pub callback_url: String,
}

/// One interactive login attempt.
pub struct LoginFlow<'a> {
    auth: &'a AuthService,
    options: LoginOptions,
}

impl<'a> LoginFlow<'a> {
    pub fn new(auth: &'a AuthService, options: LoginOptions) -> Self {
        Self { auth, options }
    }

    /// Run the flow to completion and return the stored credential.
    ///
    /// `open_browser` is handed the consent URL once the listener is up.
    /// Ends with `Error::Cancelled` if `cancel` fires first and with
    /// `Error::TimedOut` if the browser never comes back. The listener is
    /// always stopped before this returns.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        open_browser: impl FnOnce(&LoginPrompt),
    ) -> Result<Credential> {
        let state = generate_state();
        let attempt = cancel.child_token();
        let (tx, mut rx) = mpsc::channel(1);

        let server = listen_and_serve(
            attempt.clone(),
            state.clone(),
            self.options.callback_addr,
            &self.options.callback_path,
            tx,
        )
        .await?;

        // The provider must redirect to the port actually bound
        let mut config = self.auth.config().clone();
        config.redirect_uri = loopback_redirect_uri(server.local_addr(), &self.options.callback_path);

        let prompt = LoginPrompt {
            authorization_url: build_authorization_url(&config, &state),
            callback_url: config.redirect_uri.clone(),
        };
        info!(callback_url = %prompt.callback_url, "waiting for authorization");
        open_browser(&prompt);

        let received = tokio::select! {
            biased;
            _ = attempt.cancelled() => Err(Error::Cancelled),
            result = rx.recv() => result.ok_or_else(|| {
                Error::Callback(CallbackError::Startup(format!(
                    "callback listener stopped without a result (phase {:?})",
                    server.phase()
                )))
            }),
            _ = tokio::time::sleep(self.options.timeout) => Err(Error::TimedOut(self.options.timeout)),
        };

        attempt.cancel();
        let outcome = server.stopped().await;
        debug!(?outcome, "login listener finished");

        match received? {
            CallbackResult::AuthorizationCode(code) => {
                self.auth.exchange_code_with(&config, &code).await
            }
            CallbackResult::Error(e) => Err(Error::Callback(e)),
        }
    }
}
