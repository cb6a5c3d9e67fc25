//! Google OAuth constants
//!
//! Endpoint defaults for Google's OAuth 2.0 server. The authorize and token
//! endpoints normally come from the client secret file; these values fill in
//! when the descriptor omits them. The revoke endpoint never appears in the
//! descriptor.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Authorization (consent screen) endpoint
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Token revocation endpoint
pub const REVOKE_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";

/// Full read/write access to the user's YouTube account. Needed to create
/// playlists and insert items, not just list them.
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// An access token this close to its expiry is treated as already expired.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(10);

/// How long the callback listener may take to finish in-flight responses
/// once shutdown starts.
pub const CALLBACK_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default bind address for the loopback callback listener
pub const DEFAULT_CALLBACK_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080));

/// Default route for the loopback callback listener
pub const DEFAULT_CALLBACK_PATH: &str = "/";

/// Default upper bound on how long a login attempt waits for the browser
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);
