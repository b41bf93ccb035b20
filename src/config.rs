//! Application configuration loaded from environment variables.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};

/// Default base for contact links (Messenger).
pub const DEFAULT_CONTACT_BASE_URL: &str = "https://m.me/";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Facebook app ID (public)
    pub facebook_app_id: String,
    /// OAuth redirect URI registered with Facebook
    pub facebook_redirect_uri: String,
    /// Frontend URL to return to after login
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Prefix joined with the user's contact handle
    pub contact_base_url: String,
    /// Keep all data in process instead of Firestore
    pub use_memory_store: bool,

    // --- Secrets ---
    /// Facebook app secret
    pub facebook_app_secret: String,
    /// HMAC key for signing the OAuth state parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            facebook_app_id: "test_app_id".to_string(),
            facebook_redirect_uri: "http://localhost:8080/auth/facebook/callback".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            contact_base_url: DEFAULT_CONTACT_BASE_URL.to_string(),
            use_memory_store: true,
            facebook_app_secret: "test_secret".to_string(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!!".to_vec(),
        }
    }

    /// Address the server listens on.
    ///
    /// The process holds one user's session, so it is only reachable from
    /// the local machine.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        Ok(Self {
            facebook_app_id: env::var("FACEBOOK_APP_ID")
                .map_err(|_| ConfigError::Missing("FACEBOOK_APP_ID"))?,
            facebook_redirect_uri: env::var("FACEBOOK_REDIRECT_URI").unwrap_or_else(|_| {
                format!("http://localhost:{}/auth/facebook/callback", port)
            }),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port,
            contact_base_url: env::var("CONTACT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CONTACT_BASE_URL.to_string()),
            use_memory_store: env::var("USE_MEMORY_STORE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),

            facebook_app_secret: env::var("FACEBOOK_APP_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FACEBOOK_APP_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
