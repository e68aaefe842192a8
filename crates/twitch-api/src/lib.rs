//! Twitch Helix client for stream-status polling.
//!
//! Provides an app-access-token cache (client-credentials grant) and
//! batched REST lookups for streams, users, games, channels and VODs.

pub mod api;
pub mod auth;

pub use api::HelixClient;
pub use auth::{AppToken, TokenCache};

/// Client-credentials pair. Optional at the application level: without
/// credentials the whole notification subsystem degrades to a no-op.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Token cache plus REST client, sharing one credentials pair.
pub struct TwitchClient {
    pub tokens: TokenCache,
    pub api: HelixClient,
}

impl TwitchClient {
    pub fn new(credentials: Credentials) -> Self {
        let api = HelixClient::new(credentials.client_id.clone());
        Self {
            tokens: TokenCache::new(credentials),
            api,
        }
    }
}

/// Unified error type for the twitch-api crate.
#[derive(Debug, thiserror::Error)]
pub enum TwitchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("Twitch API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}
