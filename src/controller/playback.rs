//! Mood batches and transport commands

use tokio::sync::oneshot;

use crate::error::{MoodifyError, Result};
use crate::model::{ConnectionState, TrackIdentifier};
use crate::mood::{feature_profile, MoodLabel};
use crate::queue::BatchHandle;
use crate::recommendations::RecommendationRequest;

use super::{Command, SessionController};

fn not_connected() -> MoodifyError {
    MoodifyError::Connection("remote player is not connected".to_string())
}

impl SessionController {
    pub(super) fn handle_play_for_mood(
        &mut self,
        mood: MoodLabel,
        genres: Vec<String>,
        reply: oneshot::Sender<Result<BatchHandle>>,
    ) {
        let profile = feature_profile(&mood);
        let request = RecommendationRequest::new(&genres, profile);
        tracing::info!(
            mood = %mood,
            seeds = ?request.seed_genres(),
            "Requesting recommendations for mood"
        );

        let epoch = self.epoch;
        let token = self.tokens.get().cloned();
        let fetcher = self.fetcher.clone();
        let notifier = self.notifier();
        tokio::spawn(async move {
            let result = fetcher.fetch(&request, token.as_ref()).await;
            notifier.send(Command::RecommendationsFetched {
                epoch,
                mood,
                result,
                reply,
            });
        });
    }

    /// Schedules fetched tracks in the order they were returned.
    /// Completions from a connection that has since been torn down enqueue
    /// nothing, even if a new connection is up by then.
    pub(super) fn on_recommendations(
        &mut self,
        epoch: u64,
        mood: MoodLabel,
        result: Result<Vec<TrackIdentifier>>,
        reply: oneshot::Sender<Result<BatchHandle>>,
    ) {
        let outcome = match result {
            Ok(_) if self.connection() != ConnectionState::Connected => {
                tracing::warn!(mood = %mood, "Recommendations arrived while disconnected, nothing enqueued");
                Err(not_connected())
            }
            Ok(_) if epoch != self.epoch => {
                tracing::warn!(
                    mood = %mood,
                    epoch,
                    current = self.epoch,
                    "Recommendations belong to a closed connection, nothing enqueued"
                );
                Err(not_connected())
            }
            Ok(tracks) => {
                if tracks.is_empty() {
                    tracing::warn!(mood = %mood, "No recommendations returned");
                }
                Ok(self.scheduler.schedule(tracks))
            }
            Err(e) => {
                tracing::error!(mood = %mood, error = %e, "Failed to fetch recommendations");
                Err(e)
            }
        };
        let _ = reply.send(outcome);
    }

    pub(super) fn handle_play_track(&self, track: TrackIdentifier) {
        if !self.ensure_connected("play") {
            return;
        }
        let player = self.player.clone();
        tokio::spawn(async move {
            match player.play(&track).await {
                Ok(()) => tracing::info!(uri = %track, "Playback started"),
                Err(e) => tracing::error!(uri = %track, error = %e, "Play failed"),
            }
        });
    }

    /// Sends pause or resume based on the last pushed state. The paused flag
    /// itself only changes when the player pushes its new state.
    pub(super) fn handle_toggle_play_pause(&self) {
        if !self.ensure_connected("toggle playback") {
            return;
        }
        let is_paused = self.state.borrow().is_paused;
        tracing::debug!(is_paused, "Toggling playback");

        let player = self.player.clone();
        tokio::spawn(async move {
            let result = if is_paused {
                player.resume().await
            } else {
                player.pause().await
            };
            match result {
                Ok(()) => tracing::info!(action = if is_paused { "resumed" } else { "paused" }, "Playback toggled"),
                Err(e) => tracing::error!(error = %e, "Toggle playback failed"),
            }
        });
    }

    pub(super) fn handle_skip(&self, forward: bool) {
        if !self.ensure_connected("skip") {
            return;
        }
        let player = self.player.clone();
        tokio::spawn(async move {
            let result = if forward {
                player.skip_next().await
            } else {
                player.skip_previous().await
            };
            match result {
                Ok(()) => tracing::info!(forward, "Skipped track"),
                Err(e) => tracing::error!(forward, error = %e, "Skip failed"),
            }
        });
    }

    fn ensure_connected(&self, action: &str) -> bool {
        if self.connection() == ConnectionState::Connected {
            return true;
        }
        tracing::warn!(action, error = %not_connected(), "Ignoring player command");
        false
    }
}
