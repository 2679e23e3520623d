//! Executes recommendation queries and extracts track URIs

use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde_json::Value;

use crate::config::{Config, RetryPolicy};
use crate::error::{MoodifyError, Result};
use crate::model::{AccessToken, TrackIdentifier};

use super::request::RecommendationRequest;

/// HTTP client for the recommendation endpoint
#[derive(Clone)]
pub struct RecommendationFetcher {
    http: reqwest::Client,
    api_base: String,
    retry: RetryPolicy,
}

impl RecommendationFetcher {
    pub fn new(config: &Config) -> Self {
        Self::with_client(reqwest::Client::new(), config.api_base.clone(), config.retry)
    }

    pub fn with_client(http: reqwest::Client, api_base: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            retry,
        }
    }

    /// Fetches recommended tracks in the order the service returned them.
    ///
    /// A missing token fails with `Auth` before anything goes on the wire.
    /// Retryable network failures are retried with exponential backoff;
    /// with `RetryPolicy::none()` a single attempt is made and every failure
    /// is returned as is.
    pub async fn fetch(
        &self,
        request: &RecommendationRequest,
        token: Option<&AccessToken>,
    ) -> Result<Vec<TrackIdentifier>> {
        let token = token.ok_or_else(|| {
            MoodifyError::Auth("no access token available for recommendation request".to_string())
        })?;
        let url = request.url(&self.api_base)?;

        crate::log_api_request!("recommendations", url = %url, seeds = ?request.seed_genres());

        let mut attempt = 0;
        let result = loop {
            match self.fetch_once(&url, token).await {
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Recommendation request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => break other,
            }
        };

        crate::log_api_result!("recommendations", result);
        if let Ok(tracks) = &result {
            tracing::debug!(count = tracks.len(), "Parsed recommended track URIs");
        }
        result
    }

    async fn fetch_once(&self, url: &Url, token: &AccessToken) -> Result<Vec<TrackIdentifier>> {
        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| MoodifyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| MoodifyError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).into_owned();
            return Err(MoodifyError::from_status(status.as_u16(), message));
        }

        parse_track_uris(&body)
    }
}

/// Pulls `tracks[*].uri` out of a recommendation response.
///
/// Elements without a string `uri` are skipped. A missing or null `tracks`
/// field is an empty result; a non-object body or a non-array `tracks` is a
/// parse error.
pub fn parse_track_uris(body: &[u8]) -> Result<Vec<TrackIdentifier>> {
    let json: Value = serde_json::from_slice(body)?;
    let object = json
        .as_object()
        .ok_or_else(|| MoodifyError::Parse("expected a JSON object".to_string()))?;

    match object.get("tracks") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(tracks)) => Ok(tracks
            .iter()
            .filter_map(|track| track.get("uri").and_then(Value::as_str))
            .map(TrackIdentifier::from)
            .collect()),
        Some(other) => Err(MoodifyError::Parse(format!(
            "expected 'tracks' to be an array, got {}",
            other
        ))),
    }
}
