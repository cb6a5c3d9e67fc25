//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret is never stored in the TOML; it is read from
//! the Google-issued `client_secret_file`.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use youtube_auth::{DEFAULT_CALLBACK_ADDR, DEFAULT_CALLBACK_PATH, DEFAULT_LOGIN_TIMEOUT};
use youtube_playlists::Privacy;

pub const DEFAULT_CONFIG_FILE: &str = "playlist-reorder.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub youtube: YouTubeSettings,
}

/// OAuth client and credential settings
#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Google client descriptor (`client_secret.json`)
    #[serde(default = "default_client_secret_file")]
    pub client_secret_file: PathBuf,
    /// Where the OAuth credential is persisted
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_callback_addr")]
    pub callback_addr: SocketAddr,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
    #[serde(default)]
    pub revoke_url: Option<String>,
}

/// YouTube Data API settings
#[derive(Debug, Deserialize)]
pub struct YouTubeSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Visibility of playlists created by `reorder`
    #[serde(default)]
    pub privacy: Privacy,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_secret_file: default_client_secret_file(),
            token_file: default_token_file(),
            callback_addr: default_callback_addr(),
            callback_path: default_callback_path(),
            login_timeout_secs: default_login_timeout(),
            revoke_url: None,
        }
    }
}

impl Default for YouTubeSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout(),
            privacy: Privacy::default(),
        }
    }
}

impl AuthSettings {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

impl YouTubeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_client_secret_file() -> PathBuf {
    PathBuf::from("client_secret.json")
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_callback_addr() -> SocketAddr {
    DEFAULT_CALLBACK_ADDR
}

fn default_callback_path() -> String {
    DEFAULT_CALLBACK_PATH.to_string()
}

fn default_login_timeout() -> u64 {
    DEFAULT_LOGIN_TIMEOUT.as_secs()
}

fn default_api_base_url() -> String {
    youtube_playlists::client::DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// File path overrides:
    /// 1. CLIENT_SECRET_FILE env var replaces `auth.client_secret_file`
    /// 2. TOKEN_FILE env var replaces `auth.token_file`
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file at the default location yields
    /// built-in defaults. A missing file the user named is still an error.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_FILE) && !path.exists() {
            let mut config = Config::default();
            config.apply_env();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Config file path from `--config` (which clap also fills from
    /// CONFIG_PATH), else the default.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        cli_path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
    }

    fn apply_env(&mut self) {
        if let Ok(p) = std::env::var("CLIENT_SECRET_FILE") {
            self.auth.client_secret_file = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("TOKEN_FILE") {
            self.auth.token_file = PathBuf::from(p);
        }
    }

    fn validate(&self) -> common::Result<()> {
        if !self.auth.callback_path.starts_with('/') {
            return Err(common::Error::Config(format!(
                "callback_path must start with '/', got: {}",
                self.auth.callback_path
            )));
        }

        if self.auth.login_timeout_secs == 0 {
            return Err(common::Error::Config(
                "login_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.youtube.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if !is_http_url(&self.youtube.api_base_url) {
            return Err(common::Error::Config(format!(
                "api_base_url must start with http:// or https://, got: {}",
                self.youtube.api_base_url
            )));
        }

        if let Some(ref url) = self.auth.revoke_url {
            if !is_http_url(url) {
                return Err(common::Error::Config(format!(
                    "revoke_url must start with http:// or https://, got: {url}"
                )));
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_overrides() {
        unsafe {
            remove_env("CLIENT_SECRET_FILE");
            remove_env("TOKEN_FILE");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_toml() -> &'static str {
        r#"
[auth]
client_secret_file = "/etc/playlist-reorder/client_secret.json"
token_file = "/var/lib/playlist-reorder/token.json"
callback_addr = "127.0.0.1:9004"
callback_path = "/oauth/callback"
login_timeout_secs = 120

[youtube]
api_base_url = "https://www.googleapis.com/youtube/v3"
timeout_secs = 10
privacy = "unlisted"
"#
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.auth.client_secret_file,
            PathBuf::from("/etc/playlist-reorder/client_secret.json")
        );
        assert_eq!(config.auth.callback_addr.port(), 9004);
        assert_eq!(config.auth.callback_path, "/oauth/callback");
        assert_eq!(config.auth.login_timeout(), Duration::from_secs(120));
        assert!(config.auth.revoke_url.is_none());
        assert_eq!(config.youtube.timeout(), Duration::from_secs(10));
        assert_eq!(config.youtube.privacy, Privacy::Unlisted);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.auth.client_secret_file, PathBuf::from("client_secret.json"));
        assert_eq!(config.auth.token_file, PathBuf::from("token.json"));
        assert_eq!(config.auth.callback_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.auth.callback_path, "/");
        assert_eq!(config.auth.login_timeout_secs, 300);
        assert_eq!(
            config.youtube.api_base_url,
            "https://www.googleapis.com/youtube/v3"
        );
        assert_eq!(config.youtube.timeout_secs, 30);
        assert_eq!(config.youtube.privacy, Privacy::Public);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_or_default_missing_explicit_file_is_error() {
        let result = Config::load_or_default(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err(), "a named config file must exist");
    }

    #[test]
    fn test_load_or_default_without_default_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        // The test binary runs from the crate directory, which has no config file
        assert!(!Path::new(DEFAULT_CONFIG_FILE).exists());

        let config = Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.auth.token_file, PathBuf::from("token.json"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");

        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_env_overrides_file_paths() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe {
            set_env("CLIENT_SECRET_FILE", "/env/secret.json");
            set_env("TOKEN_FILE", "/env/token.json");
        }
        let config = Config::load(&path).unwrap();
        clear_overrides();

        assert_eq!(config.auth.client_secret_file, PathBuf::from("/env/secret.json"));
        assert_eq!(config.auth.token_file, PathBuf::from("/env/token.json"));
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_default() {
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_relative_callback_path_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[auth]\ncallback_path = \"oauth\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("callback_path"), "got: {err}");
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();

        for (body, field) in [
            ("[auth]\nlogin_timeout_secs = 0\n", "login_timeout_secs"),
            ("[youtube]\ntimeout_secs = 0\n", "timeout_secs"),
        ] {
            let path = write_config(&dir, body);
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains(field), "got: {err}");
        }
    }

    #[test]
    fn test_invalid_urls_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();

        for (body, field) in [
            ("[youtube]\napi_base_url = \"ftp://example.com\"\n", "api_base_url"),
            ("[auth]\nrevoke_url = \"oauth2.googleapis.com/revoke\"\n", "revoke_url"),
        ] {
            let path = write_config(&dir, body);
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains(field), "got: {err}");
        }
    }

    #[test]
    fn test_invalid_callback_addr_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[auth]\ncallback_addr = \"localhost\"\n");
        assert!(matches!(Config::load(&path), Err(common::Error::Toml(_))));
    }
}
