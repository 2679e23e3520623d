//! Connection lifecycle and synchronization of pushed player state

use std::future::Future;

use tokio::sync::oneshot;

use crate::error::{MoodifyError, Result};
use crate::model::{AlbumArt, ConnectionState, TrackIdentifier, NO_TRACK_PLAYING};
use crate::player::{PlayerState, PlayerStateStream, PlayerTrack};

use super::{Command, SessionController};

fn set_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl SessionController {
    pub(super) fn handle_connect(&mut self, reply: oneshot::Sender<Result<()>>) {
        match self.connection() {
            ConnectionState::Connected => {
                tracing::debug!("Already connected");
                let _ = reply.send(Ok(()));
            }
            ConnectionState::Connecting => {
                tracing::debug!("Connection already in progress");
                self.connect_waiters.push(reply);
            }
            ConnectionState::Disconnected => {
                let Some(token) = self.tokens.get().cloned() else {
                    tracing::warn!("Cannot connect: no access token set");
                    let _ = reply.send(Err(MoodifyError::Auth(
                        "no access token set; complete authorization first".to_string(),
                    )));
                    return;
                };

                self.epoch += 1;
                let epoch = self.epoch;
                self.set_connection(ConnectionState::Connecting);
                self.connect_waiters.push(reply);

                tracing::info!(epoch, "Connecting to remote player");
                let player = self.player.clone();
                let notifier = self.notifier();
                self.spawn_lifecycle(async move {
                    let result = async {
                        player.connect(&token).await?;
                        let stream = player.subscribe().await?;
                        // A failed initial read is not fatal; the next push fills the state in
                        let initial = match player.player_state().await {
                            Ok(state) => Some(state),
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to fetch initial player state");
                                None
                            }
                        };
                        Ok::<_, MoodifyError>((stream, initial))
                    }
                    .await;
                    notifier.send(Command::ConnectFinished { epoch, result });
                });
            }
        }
    }

    pub(super) fn on_connect_finished(
        &mut self,
        epoch: u64,
        result: Result<(PlayerStateStream, Option<PlayerState>)>,
    ) {
        if epoch != self.epoch || self.connection() != ConnectionState::Connecting {
            tracing::debug!(epoch, current = self.epoch, "Ignoring stale connect completion");
            if result.is_ok() && self.connection() == ConnectionState::Disconnected {
                let player = self.player.clone();
                self.spawn_lifecycle(async move { player.disconnect().await });
            }
            return;
        }

        match result {
            Ok((stream, initial)) => {
                tracing::info!(epoch, "Connected to remote player");
                self.set_connection(ConnectionState::Connected);
                self.start_listener(stream, epoch);
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
                if let Some(state) = initial {
                    self.apply_player_state(state);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to remote player");
                self.set_connection(ConnectionState::Disconnected);
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Err(e.clone()));
                }
            }
        }
    }

    /// Player connect and disconnect calls run one at a time, in the order
    /// they were issued, so a late teardown never hits a newer connection.
    fn spawn_lifecycle<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.lifecycle.take();
        self.lifecycle = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            work.await;
        }));
    }

    fn start_listener(&mut self, mut stream: PlayerStateStream, epoch: u64) {
        if let Some(previous) = self.listener.take() {
            previous.abort();
        }

        let notifier = self.notifier();
        self.listener = Some(tokio::spawn(async move {
            while let Some(state) = stream.recv().await {
                if !notifier.send(Command::PlayerStatePushed { epoch, state }) {
                    return;
                }
            }
            notifier.send(Command::ConnectionLost { epoch });
        }));
    }

    /// Explicit disconnect: playback state back to defaults and token cleared.
    ///
    /// In-flight fetches and dispatched enqueues are not cancelled; their
    /// completions find a newer epoch and are dropped.
    pub(super) fn handle_disconnect(&mut self) {
        let was = self.connection();
        self.teardown_connection();
        self.tokens.clear();

        if was == ConnectionState::Disconnected {
            tracing::info!("Not connected; local state and token reset");
        } else {
            tracing::info!("Disconnecting from remote player");
            let player = self.player.clone();
            self.spawn_lifecycle(async move { player.disconnect().await });
        }
    }

    pub(super) fn on_connection_lost(&mut self, epoch: u64) {
        if epoch != self.epoch || self.connection() != ConnectionState::Connected {
            return;
        }
        // Token is kept so the caller can reconnect
        tracing::warn!(epoch, "Remote player connection lost");
        self.teardown_connection();
    }

    fn teardown_connection(&mut self) {
        self.epoch += 1;
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.art_in_flight = None;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(MoodifyError::Connection(
                "disconnected before handshake completed".to_string(),
            )));
        }
        self.state.send_modify(|state| state.reset());
    }

    pub(super) fn on_player_state(&mut self, epoch: u64, state: PlayerState) {
        if epoch != self.epoch || self.connection() != ConnectionState::Connected {
            tracing::debug!(epoch, current = self.epoch, "Ignoring player state from a closed connection");
            return;
        }
        self.apply_player_state(state);
    }

    /// Pushed state is authoritative for track, album and the paused flag
    fn apply_player_state(&mut self, pushed: PlayerState) {
        let mut needs_art = None;

        self.state.send_if_modified(|state| {
            let mut changed = set_if_changed(&mut state.is_paused, pushed.is_paused);

            match &pushed.track {
                Some(track) => {
                    changed |= set_if_changed(&mut state.track_name, track.name.clone());
                    changed |= set_if_changed(&mut state.album_name, track.album.clone());
                    changed |= set_if_changed(&mut state.track_uri, Some(track.uri.clone()));
                    if changed {
                        tracing::info!(
                            track = %track.name,
                            album = %track.album,
                            uri = %track.uri,
                            paused = pushed.is_paused,
                            "Player state updated"
                        );
                    }
                    if !state.has_art_for_current_track() {
                        needs_art = Some(track.clone());
                    }
                }
                None => {
                    changed |= set_if_changed(&mut state.track_name, NO_TRACK_PLAYING.to_string());
                    changed |= set_if_changed(&mut state.album_name, String::new());
                    changed |= set_if_changed(&mut state.track_uri, None);
                    changed |= set_if_changed(&mut state.album_art, None);
                }
            }

            changed
        });

        if let Some(track) = needs_art {
            self.fetch_album_art(track);
        }
    }

    fn fetch_album_art(&mut self, track: PlayerTrack) {
        if self.art_in_flight.as_ref() == Some(&track.uri) {
            return;
        }
        self.art_in_flight = Some(track.uri.clone());

        let epoch = self.epoch;
        let size = self.album_art_size;
        let player = self.player.clone();
        let notifier = self.notifier();
        tokio::spawn(async move {
            let result = player.fetch_image(&track, size).await;
            notifier.send(Command::AlbumArtFetched {
                epoch,
                track: track.uri,
                result,
            });
        });
    }

    /// Art is only applied if it still belongs to the current track.
    /// A failed fetch keeps whatever art was shown before.
    pub(super) fn on_album_art(&mut self, epoch: u64, track: TrackIdentifier, result: Result<AlbumArt>) {
        if epoch != self.epoch || self.connection() != ConnectionState::Connected {
            return;
        }
        if self.art_in_flight.as_ref() == Some(&track) {
            self.art_in_flight = None;
        }

        match result {
            Ok(art) => {
                self.state.send_if_modified(|state| {
                    if state.track_uri.as_ref() != Some(&track) {
                        tracing::debug!(uri = %track, "Discarding album art for a track no longer playing");
                        return false;
                    }
                    tracing::info!(uri = %track, bytes = art.bytes.len(), "Album art updated");
                    state.album_art = Some(art);
                    true
                });
            }
            Err(e) => {
                tracing::warn!(uri = %track, error = %e, "Failed to fetch album art");
            }
        }
    }
}
