use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use super::*;
use crate::AppToken;
use crate::api::models::HelixResponse;

impl HelixClient {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
        }
    }

    fn auth_headers(&self, token: &AppToken) -> Result<HeaderMap, TwitchError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", token.access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| TwitchError::TokenRequestFailed(e.to_string()))?,
        );
        headers.insert(
            "Client-Id",
            HeaderValue::from_str(&self.client_id)
                .map_err(|e| TwitchError::TokenRequestFailed(e.to_string()))?,
        );
        Ok(headers)
    }

    /// Execute a GET request with auth headers.
    pub(super) async fn authenticated_get(
        &self,
        url: Url,
        token: &AppToken,
    ) -> Result<String, TwitchError> {
        let headers = self.auth_headers(token)?;
        let resp = self.http.get(url).headers(headers).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(TwitchError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    /// GET one `data`-enveloped page per batched URL, concatenating
    /// the results.
    pub(super) async fn fetch_batched<T: DeserializeOwned>(
        &self,
        urls: Vec<Url>,
        token: &AppToken,
    ) -> Result<Vec<T>, TwitchError> {
        let mut data = Vec::new();
        for url in urls {
            let body = self.authenticated_get(url, token).await?;
            let resp: HelixResponse<T> = serde_json::from_str(&body)?;
            data.extend(resp.data);
        }
        Ok(data)
    }
}
