//! Recommendation pipeline - query construction and fetching
//!
//! - `request`: builds the recommendation query from genres and a feature profile
//! - `fetcher`: performs the HTTP call and parses track URIs
//! - `genres`: genre vocabulary offered to users

mod fetcher;
pub mod genres;
mod request;

pub use fetcher::{parse_track_uris, RecommendationFetcher};
pub use request::{RecommendationRequest, MAX_SEED_GENRES, RECOMMENDATION_LIMIT};
