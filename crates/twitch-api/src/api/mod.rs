//! Twitch Helix REST API client.
//!
//! Batched lookups with automatic Bearer token + Client-ID header
//! injection. All multi-value endpoints chunk their inputs by 100 (the
//! Helix per-request cap) and key their result maps by lowercase
//! login/name for case-insensitive matching.

mod channels;
mod games;
mod request;
mod streams;
mod users;
mod videos;

pub mod models;

pub use models::{ChannelInfo, GameData, HelixResponse, StreamData, UserData, VideoData};

use url::Url;

use crate::TwitchError;

const HELIX_BASE: &str = "https://api.twitch.tv/helix";

/// Helix per-request cap on repeated query parameters.
const MAX_BATCH: usize = 100;

/// Twitch Helix API client with automatic auth header injection.
pub struct HelixClient {
    pub(crate) http: reqwest::Client,
    pub(crate) client_id: String,
}

/// Build one URL per chunk of up to [`MAX_BATCH`] values, with the
/// given query parameter repeated per value.
pub(crate) fn batched_urls(
    endpoint: &str,
    param: &str,
    values: &[String],
) -> Result<Vec<Url>, TwitchError> {
    values
        .chunks(MAX_BATCH)
        .map(|chunk| {
            let mut url = Url::parse(&format!("{HELIX_BASE}/{endpoint}"))?;
            {
                let mut pairs = url.query_pairs_mut();
                for value in chunk {
                    pairs.append_pair(param, value);
                }
            }
            Ok(url)
        })
        .collect()
}
