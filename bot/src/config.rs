//! Environment-derived bot configuration.

use std::path::PathBuf;
use std::time::Duration;

use twitch_api::Credentials;

use crate::scheduler::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub database_path: PathBuf,
    /// Absent credentials disable the notification subsystem; they are
    /// never an error.
    pub twitch: Option<Credentials>,
    pub poll_interval: Duration,
}

impl BotConfig {
    /// Read configuration from the environment (and a `.env` file if
    /// present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database_path = std::env::var("HERALD_DATABASE")
            .unwrap_or_else(|_| "herald.db".to_string())
            .into();

        let twitch = match (
            std::env::var("TWITCH_CLIENT_ID"),
            std::env::var("TWITCH_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Some(Credentials {
                    client_id,
                    client_secret,
                })
            }
            _ => {
                tracing::warn!("Twitch credentials not set, stream notifications are disabled");
                None
            }
        };

        let poll_interval = std::env::var("HERALD_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .map(clamp_interval)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        Self {
            database_path,
            twitch,
            poll_interval,
        }
    }
}

/// Polling precision floor; sub-second intervals would hammer both the
/// platform and the upstream API.
fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}
