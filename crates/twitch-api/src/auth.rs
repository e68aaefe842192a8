//! App access token cache for the client-credentials grant.
//!
//! One token is shared process-wide by all guilds' notification
//! checks. Refreshes happen proactively 60 seconds before expiry; the
//! cache lock is held across the upstream request, so concurrent
//! callers observe exactly one refresh.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{Credentials, TwitchError};

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Seconds before expiry at which a token is refreshed proactively.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct TokenCache {
    credentials: Credentials,
    http: reqwest::Client,
    cached: Mutex<Option<AppToken>>,
}

impl TokenCache {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Get a valid token, refreshing if it expires within the margin.
    pub async fn app_token(&self) -> Result<AppToken, TwitchError> {
        self.token_with(self.request_token()).await
    }

    /// Cache-or-fetch core, factored out so the single-flight behavior
    /// is testable without the network.
    async fn token_with<F>(&self, fetch: F) -> Result<AppToken, TwitchError>
    where
        F: Future<Output = Result<AppToken, TwitchError>>,
    {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !needs_refresh(token.expires_at, Utc::now()) {
                tracing::trace!("reusing cached app token");
                return Ok(token.clone());
            }
        }

        let token = fetch.await?;
        tracing::info!(expires_at = %token.expires_at, "acquired new app token");
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn request_token(&self) -> Result<AppToken, TwitchError> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let resp = self.http.post(TOKEN_URL).form(&params).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(TwitchError::TokenRequestFailed(format!("{status}: {body}")));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TwitchError::TokenRequestFailed(format!("failed to parse response: {e}")))?;

        Ok(AppToken {
            access_token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}

fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now + Duration::seconds(REFRESH_MARGIN_SECS) >= expires_at
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn cache() -> TokenCache {
        TokenCache::new(Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        })
    }

    fn token_valid_for(secs: i64) -> AppToken {
        AppToken {
            access_token: "tok".into(),
            expires_at: Utc::now() + Duration::seconds(secs),
        }
    }

    #[test]
    fn refresh_margin_is_sixty_seconds() {
        let now = Utc::now();
        assert!(!needs_refresh(now + Duration::seconds(120), now));
        assert!(needs_refresh(now + Duration::seconds(59), now));
        assert!(needs_refresh(now + Duration::seconds(60), now));
        assert!(needs_refresh(now - Duration::seconds(1), now));
    }

    #[tokio::test]
    async fn valid_token_is_reused_without_fetching() {
        let cache = cache();
        let fetches = Arc::new(AtomicUsize::new(0));

        let fetch = |fetches: Arc<AtomicUsize>| async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(token_valid_for(7200))
        };

        let first = cache.token_with(fetch(fetches.clone())).await.unwrap();
        let second = cache.token_with(fetch(fetches.clone())).await.unwrap();

        assert_eq!(first.access_token, second.access_token);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_issue_a_single_fetch() {
        let cache = Arc::new(cache());
        let fetches = Arc::new(AtomicUsize::new(0));

        let fetch = |fetches: Arc<AtomicUsize>| async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            // Yield so the other caller is queued on the cache lock.
            tokio::task::yield_now().await;
            Ok(token_valid_for(7200))
        };

        let (a, b) = tokio::join!(
            cache.token_with(fetch(fetches.clone())),
            cache.token_with(fetch(fetches.clone())),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expiring_token_triggers_exactly_one_refresh() {
        let cache = cache();
        // Within the 60s margin, so the next call must refresh.
        *cache.cached.lock().await = Some(token_valid_for(30));

        let fetches = Arc::new(AtomicUsize::new(0));
        let fetch = |fetches: Arc<AtomicUsize>| async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(token_valid_for(7200))
        };

        let (a, b) = tokio::join!(
            cache.token_with(fetch(fetches.clone())),
            cache.token_with(fetch(fetches.clone())),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
