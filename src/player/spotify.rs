//! Remote player over the Spotify Web API

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rspotify::{
    model::{CurrentPlaybackContext, Device, Image, PlayableId, PlayableItem, TrackId},
    prelude::*,
    AuthCodeSpotify, ClientError, Config as SpotifyConfig, Token,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{MoodifyError, Result};
use crate::model::{AccessToken, AlbumArt, TrackIdentifier};

use super::{ArtworkRef, PlayerState, PlayerStateStream, PlayerTrack, RemotePlayer};

/// Consecutive failed polls before the push stream is treated as lost
const MAX_POLL_FAILURES: u32 = 3;

/// Web API has no push channel, so `subscribe` polls the current playback
/// and forwards a state whenever the track or paused status changes.
pub struct SpotifyPlayer {
    client: Arc<AuthCodeSpotify>,
    http: reqwest::Client,
    local_device_name: Option<String>,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl SpotifyPlayer {
    pub fn new(config: &Config) -> Self {
        let client = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            SpotifyConfig {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );
        tracing::debug!("rspotify client initialized");

        // Desktop clients register under the machine's hostname
        let local_device_name = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().to_string());

        Self {
            client: Arc::new(client),
            http: reqwest::Client::new(),
            local_device_name,
            poll_interval: config.poll_interval,
            poller: Mutex::new(None),
        }
    }

    async fn set_token(&self, token: Option<Token>) -> Result<()> {
        let mut guard = self
            .client
            .token
            .lock()
            .await
            .map_err(|_| MoodifyError::Connection("rspotify token lock poisoned".to_string()))?;
        *guard = token;
        Ok(())
    }

    async fn target_device(&self) -> Option<String> {
        let devices = match self.client.device().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to list devices");
                return None;
            }
        };
        let device = preferred_device(&devices, self.local_device_name.as_deref());
        tracing::debug!(
            available = devices.len(),
            device = ?device.map(|d| d.name.as_str()),
            "Resolved target device"
        );
        device.and_then(|d| d.id.clone())
    }

    async fn stop_poller(&self) {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
    }
}

/// Active device first, then the one registered under this machine's name
fn preferred_device<'a>(devices: &'a [Device], local_name: Option<&str>) -> Option<&'a Device> {
    devices
        .iter()
        .find(|d| d.is_active)
        .or_else(|| local_name.and_then(|name| devices.iter().find(|d| d.name == name)))
}

fn player_error(operation: &str, err: ClientError) -> MoodifyError {
    MoodifyError::Connection(format!("{} failed: {}", operation, err))
}

fn artwork(images: &[Image]) -> Vec<ArtworkRef> {
    images
        .iter()
        .map(|image| ArtworkRef {
            url: image.url.clone(),
            width: image.width,
            height: image.height,
        })
        .collect()
}

fn player_state_from(playback: Option<&CurrentPlaybackContext>) -> PlayerState {
    let Some(playback) = playback else {
        return PlayerState {
            track: None,
            is_paused: true,
        };
    };

    let track = match &playback.item {
        Some(PlayableItem::Track(track)) => track.id.as_ref().map(|id| PlayerTrack {
            uri: TrackIdentifier::new(format!("spotify:track:{}", id.id())),
            name: track.name.clone(),
            album: track.album.name.clone(),
            artwork: artwork(&track.album.images),
        }),
        Some(PlayableItem::Episode(episode)) => Some(PlayerTrack {
            uri: TrackIdentifier::new(format!("spotify:episode:{}", episode.id.id())),
            name: episode.name.clone(),
            album: "Podcast".to_string(),
            artwork: artwork(&episode.images),
        }),
        Some(PlayableItem::Unknown(_)) | None => None,
    };

    PlayerState {
        track,
        is_paused: !playback.is_playing,
    }
}

/// Same track and same paused status means nothing worth pushing
fn same_state(a: &PlayerState, b: &PlayerState) -> bool {
    a.is_paused == b.is_paused
        && a.track.as_ref().map(|t| &t.uri) == b.track.as_ref().map(|t| &t.uri)
}

#[async_trait]
impl RemotePlayer for SpotifyPlayer {
    async fn connect(&self, token: &AccessToken) -> Result<()> {
        self.set_token(Some(Token {
            access_token: token.secret().to_string(),
            expires_in: chrono::Duration::seconds(3600),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(3600)),
            scopes: HashSet::new(),
            refresh_token: None,
        }))
        .await?;
        tracing::debug!("rspotify token set");

        crate::log_api_request!("connect", device = ?self.local_device_name);
        let result = self
            .client
            .current_playback(None, None::<Vec<_>>)
            .await
            .map(|_| ())
            .map_err(|e| player_error("handshake", e));
        crate::log_api_result!("connect", result);

        if result.is_err() {
            self.set_token(None).await?;
        }
        result
    }

    async fn disconnect(&self) {
        self.stop_poller().await;
        if let Err(e) = self.set_token(None).await {
            tracing::warn!(error = %e, "Failed to clear player token");
        }
        tracing::info!("Spotify player disconnected");
    }

    async fn subscribe(&self) -> Result<PlayerStateStream> {
        self.stop_poller().await;

        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut last: Option<PlayerState> = None;
            let mut failures = 0;

            loop {
                ticker.tick().await;
                match client.current_playback(None, None::<Vec<_>>).await {
                    Ok(playback) => {
                        failures = 0;
                        let state = player_state_from(playback.as_ref());
                        if last.as_ref().is_some_and(|prev| same_state(prev, &state)) {
                            continue;
                        }
                        tracing::trace!(?state, "Player state changed");
                        last = Some(state.clone());
                        if tx.send(state).is_err() {
                            tracing::debug!("Player state subscriber dropped, stopping poller");
                            break;
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::warn!(error = %e, failures, "Failed to poll player state");
                        if failures >= MAX_POLL_FAILURES {
                            tracing::error!("Player state polling gave up, reporting connection lost");
                            break;
                        }
                    }
                }
            }
        });

        *self.poller.lock().await = Some(handle);
        tracing::info!(interval_ms = poll_interval.as_millis() as u64, "Subscribed to player state");
        Ok(rx)
    }

    async fn player_state(&self) -> Result<PlayerState> {
        let playback = self
            .client
            .current_playback(None, None::<Vec<_>>)
            .await
            .map_err(|e| player_error("current_playback", e))?;
        Ok(player_state_from(playback.as_ref()))
    }

    async fn play(&self, track: &TrackIdentifier) -> Result<()> {
        let device_id = self.target_device().await;
        tracing::debug!(uri = %track, device_id = ?device_id, "API: play_track");

        let id = TrackId::from_id(track.id())
            .map_err(|e| MoodifyError::Connection(format!("invalid track id {}: {}", track, e)))?;
        self.client
            .start_uris_playback([PlayableId::Track(id)], device_id.as_deref(), None, None)
            .await
            .map_err(|e| player_error("start_uris_playback", e))
    }

    async fn pause(&self) -> Result<()> {
        let device_id = self.target_device().await;
        tracing::debug!(device_id = ?device_id, "API: pause_playback");
        self.client
            .pause_playback(device_id.as_deref())
            .await
            .map_err(|e| player_error("pause_playback", e))
    }

    async fn resume(&self) -> Result<()> {
        let device_id = self.target_device().await;
        tracing::debug!(device_id = ?device_id, "API: resume_playback");
        self.client
            .resume_playback(device_id.as_deref(), None)
            .await
            .map_err(|e| player_error("resume_playback", e))
    }

    async fn skip_next(&self) -> Result<()> {
        let device_id = self.target_device().await;
        tracing::debug!(device_id = ?device_id, "API: next_track");
        self.client
            .next_track(device_id.as_deref())
            .await
            .map_err(|e| player_error("next_track", e))
    }

    async fn skip_previous(&self) -> Result<()> {
        let device_id = self.target_device().await;
        tracing::debug!(device_id = ?device_id, "API: previous_track");
        self.client
            .previous_track(device_id.as_deref())
            .await
            .map_err(|e| player_error("previous_track", e))
    }

    async fn enqueue(&self, track: &TrackIdentifier) -> Result<()> {
        let enqueue_error = |reason: String| MoodifyError::Enqueue {
            track: track.to_string(),
            reason,
        };

        let id = TrackId::from_id(track.id()).map_err(|e| enqueue_error(e.to_string()))?;
        let device_id = self.target_device().await;

        self.client
            .add_item_to_queue(PlayableId::Track(id), device_id.as_deref())
            .await
            .map_err(|e| enqueue_error(e.to_string()))?;

        tracing::info!(track_uri = %track, "Added track to queue");
        Ok(())
    }

    async fn fetch_image(&self, track: &PlayerTrack, size: u32) -> Result<AlbumArt> {
        let image = track.artwork_closest_to(size).ok_or_else(|| {
            MoodifyError::Parse(format!("no artwork advertised for {}", track.uri))
        })?;

        crate::log_api_request!("fetch_image", url = %image.url, size);
        let bytes = self
            .http
            .get(&image.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(AlbumArt {
            track: track.uri.clone(),
            url: image.url.clone(),
            width: image.width,
            height: image.height,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_state(uri: &str, is_paused: bool) -> PlayerState {
        PlayerState {
            track: Some(PlayerTrack {
                uri: uri.into(),
                name: "Song".to_string(),
                album: "Album".to_string(),
                artwork: Vec::new(),
            }),
            is_paused,
        }
    }

    fn device(id: &str, name: &str, is_active: bool) -> Device {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "is_active": is_active,
            "is_private_session": false,
            "is_restricted": false,
            "name": name,
            "type": "Computer",
            "volume_percent": 50
        }))
        .unwrap()
    }

    #[test]
    fn active_device_wins_over_local_one() {
        let devices = vec![device("local", "desk", false), device("phone", "pixel", true)];
        let picked = preferred_device(&devices, Some("desk"));
        assert_eq!(picked.and_then(|d| d.id.as_deref()), Some("phone"));
    }

    #[test]
    fn falls_back_to_local_device_by_name() {
        let devices = vec![device("tv", "living room", false), device("local", "desk", false)];
        let picked = preferred_device(&devices, Some("desk"));
        assert_eq!(picked.and_then(|d| d.id.as_deref()), Some("local"));
        assert!(preferred_device(&devices, None).is_none());
        assert!(preferred_device(&devices, Some("laptop")).is_none());
    }

    #[test]
    fn no_playback_maps_to_paused_empty_state() {
        let state = player_state_from(None);
        assert!(state.track.is_none());
        assert!(state.is_paused);
    }

    #[test]
    fn state_changes_are_detected_on_track_or_pause() {
        let a = track_state("spotify:track:1", false);
        assert!(same_state(&a, &track_state("spotify:track:1", false)));
        assert!(!same_state(&a, &track_state("spotify:track:2", false)));
        assert!(!same_state(&a, &track_state("spotify:track:1", true)));
    }
}
