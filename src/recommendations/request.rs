//! Recommendation query construction

use reqwest::Url;

use crate::error::{MoodifyError, Result};
use crate::mood::AudioFeatureProfile;

pub const RECOMMENDATION_LIMIT: u32 = 20;
pub const MAX_SEED_GENRES: usize = 5;
const RECOMMENDATIONS_PATH: &str = "recommendations";

/// Immutable query for one mood invocation
#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationRequest {
    seed_genres: Vec<String>,
    limit: u32,
    profile: AudioFeatureProfile,
}

impl RecommendationRequest {
    /// Takes the first five genres as given (no shuffling, no dedup) and lower-cases them
    pub fn new<S: AsRef<str>>(genres: &[S], profile: AudioFeatureProfile) -> Self {
        let seed_genres = genres
            .iter()
            .take(MAX_SEED_GENRES)
            .map(|g| g.as_ref().to_lowercase())
            .collect();

        Self {
            seed_genres,
            limit: RECOMMENDATION_LIMIT,
            profile,
        }
    }

    pub fn seed_genres(&self) -> &[String] {
        &self.seed_genres
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn profile(&self) -> &AudioFeatureProfile {
        &self.profile
    }

    /// Query parameters in a fixed order.
    ///
    /// Seed genres, limit, valence and energy bounds always come first. The
    /// optional bounds follow as loudness, acousticness, danceability (min
    /// before max), each present only when set.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let profile = &self.profile;
        let mut pairs = vec![
            ("seed_genres".to_string(), self.seed_genres.join(",")),
            ("limit".to_string(), self.limit.to_string()),
            ("min_valence".to_string(), format_bound(profile.valence.min)),
            ("max_valence".to_string(), format_bound(profile.valence.max)),
            ("min_energy".to_string(), format_bound(profile.energy.min)),
            ("max_energy".to_string(), format_bound(profile.energy.max)),
        ];

        for (feature, range) in profile.optional_features() {
            let bounds = [("min", range.min), ("max", range.max)];
            for (prefix, value) in bounds {
                if let Some(value) = value {
                    pairs.push((format!("{}_{}", prefix, feature), format_bound(value)));
                }
            }
        }

        pairs
    }

    /// Full request URL under `api_base` (e.g. `https://api.spotify.com/v1`)
    pub fn url(&self, api_base: &str) -> Result<Url> {
        let endpoint = format!(
            "{}/{}",
            api_base.trim_end_matches('/'),
            RECOMMENDATIONS_PATH
        );
        Url::parse_with_params(&endpoint, self.query_pairs()).map_err(|e| {
            MoodifyError::Config(format!("invalid API base '{}': {}", api_base, e))
        })
    }
}

/// Keeps the decimal point on whole numbers (`1.0`, `-5.0`)
fn format_bound(value: f64) -> String {
    format!("{:?}", value)
}
