//! Integration tests for the recommendation fetcher against a mock HTTP server

use std::time::Duration;

use moodify::config::RetryPolicy;
use moodify::mood::feature_profile_for;
use moodify::recommendations::{RecommendationFetcher, RecommendationRequest};
use moodify::{AccessToken, MoodifyError, TrackIdentifier};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer, retry: RetryPolicy) -> RecommendationFetcher {
    RecommendationFetcher::with_client(
        reqwest::Client::new(),
        format!("{}/v1", server.uri()),
        retry,
    )
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(10),
    }
}

fn token() -> AccessToken {
    AccessToken::new("test-token")
}

#[tokio::test]
async fn happy_mood_query_and_parsed_uris() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("seed_genres", "pop,rock,jazz,indie,metal"))
        .and(query_param("limit", "20"))
        .and(query_param("min_valence", "0.7"))
        .and(query_param("max_valence", "1.0"))
        .and(query_param("min_energy", "0.6"))
        .and(query_param("max_energy", "0.9"))
        .and(query_param("min_danceability", "0.7"))
        .and(query_param("max_danceability", "1.0"))
        .and(query_param_is_missing("min_loudness"))
        .and(query_param_is_missing("max_loudness"))
        .and(query_param_is_missing("min_acousticness"))
        .and(query_param_is_missing("max_acousticness"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks": [
                {"uri": "spotify:track:1", "name": "One"},
                {"name": "No uri"},
                {"uri": "spotify:track:2", "name": "Two"}
            ],
            "seeds": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let genres = ["Pop", "Rock", "Jazz", "Indie", "Metal", "Folk"];
    let request = RecommendationRequest::new(&genres, feature_profile_for("Happy"));

    let tracks = fetcher(&server, RetryPolicy::none())
        .fetch(&request, Some(&token()))
        .await
        .unwrap();

    assert_eq!(
        tracks,
        vec![
            TrackIdentifier::from("spotify:track:1"),
            TrackIdentifier::from("spotify:track:2"),
        ]
    );
}

#[tokio::test]
async fn angry_mood_sends_min_loudness_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .and(query_param("min_loudness", "-5.0"))
        .and(query_param_is_missing("max_loudness"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tracks": []})))
        .expect(1)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["metal"], feature_profile_for("angry"));
    let tracks = fetcher(&server, RetryPolicy::none())
        .fetch(&request, Some(&token()))
        .await
        .unwrap();

    assert!(tracks.is_empty());
}

#[tokio::test]
async fn server_errors_are_retried_with_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"tracks": [{"uri": "spotify:track:9"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["jazz"], feature_profile_for("neutral"));
    let tracks = fetcher(&server, quick_retry())
        .fetch(&request, Some(&token()))
        .await
        .unwrap();

    assert_eq!(tracks, vec![TrackIdentifier::from("spotify:track:9")]);
}

#[tokio::test]
async fn retries_give_up_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["jazz"], feature_profile_for("neutral"));
    let err = fetcher(&server, quick_retry())
        .fetch(&request, Some(&token()))
        .await
        .unwrap_err();

    assert!(matches!(err, MoodifyError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn unauthorized_is_an_auth_error_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["pop"], feature_profile_for("happy"));
    let err = fetcher(&server, quick_retry())
        .fetch(&request, Some(&token()))
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["pop"], feature_profile_for("sad"));
    let err = fetcher(&server, quick_retry())
        .fetch(&request, Some(&token()))
        .await
        .unwrap_err();

    assert!(matches!(err, MoodifyError::Parse(_)));
}

#[tokio::test]
async fn missing_token_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tracks": []})))
        .expect(0)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["pop"], feature_profile_for("happy"));
    let err = fetcher(&server, quick_retry())
        .fetch(&request, None)
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let fetcher = RecommendationFetcher::with_client(
        reqwest::Client::new(),
        "http://127.0.0.1:1/v1",
        RetryPolicy::none(),
    );
    let request = RecommendationRequest::new(&["pop"], feature_profile_for("happy"));

    let err = fetcher.fetch(&request, Some(&token())).await.unwrap_err();
    assert!(matches!(err, MoodifyError::Network(_)));
}

#[tokio::test]
async fn malformed_api_base_is_a_config_error() {
    let fetcher = RecommendationFetcher::with_client(
        reqwest::Client::new(),
        "not a url",
        RetryPolicy::none(),
    );
    let request = RecommendationRequest::new(&["pop"], feature_profile_for("happy"));

    let err = fetcher.fetch(&request, Some(&token())).await.unwrap_err();
    assert!(matches!(err, MoodifyError::Config(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn no_retry_policy_makes_a_single_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recommendations"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let request = RecommendationRequest::new(&["jazz"], feature_profile_for("neutral"));
    let err = fetcher(&server, RetryPolicy::none())
        .fetch(&request, Some(&token()))
        .await
        .unwrap_err();

    assert!(matches!(err, MoodifyError::HttpStatus { status: 503, .. }));
}
