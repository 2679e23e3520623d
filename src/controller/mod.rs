//! Controller module - the session actor
//!
//! One task owns the playback state, the access token and the connection
//! lifecycle. Callers talk to it through a cloneable [`SessionHandle`];
//! network completions and player pushes come back to it as messages, so
//! every mutation happens on that single task.
//!
//! - `player_events`: connection lifecycle and pushed player state
//! - `playback`: mood batches and transport commands

mod player_events;
mod playback;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{MoodifyError, Result};
use crate::model::{AccessToken, AlbumArt, ConnectionState, PlaybackState, TokenStore, TrackIdentifier};
use crate::mood::MoodLabel;
use crate::player::{PlayerState, PlayerStateStream, RemotePlayer};
use crate::queue::{BatchHandle, QueueScheduler};
use crate::recommendations::RecommendationFetcher;

pub(crate) enum Command {
    SetToken(AccessToken),
    Connect(oneshot::Sender<Result<()>>),
    Disconnect(oneshot::Sender<()>),
    PlayForMood {
        mood: MoodLabel,
        genres: Vec<String>,
        reply: oneshot::Sender<Result<BatchHandle>>,
    },
    PlayTrack(TrackIdentifier),
    TogglePlayPause,
    SkipNext,
    SkipPrevious,
    Shutdown,

    // Completions of work spawned by the actor
    ConnectFinished {
        epoch: u64,
        result: Result<(PlayerStateStream, Option<PlayerState>)>,
    },
    PlayerStatePushed {
        epoch: u64,
        state: PlayerState,
    },
    ConnectionLost {
        epoch: u64,
    },
    AlbumArtFetched {
        epoch: u64,
        track: TrackIdentifier,
        result: Result<AlbumArt>,
    },
    RecommendationsFetched {
        epoch: u64,
        mood: MoodLabel,
        result: Result<Vec<TrackIdentifier>>,
        reply: oneshot::Sender<Result<BatchHandle>>,
    },
}

/// Sends completions back to the actor without keeping it alive
#[derive(Clone)]
pub(crate) struct Notifier(mpsc::WeakUnboundedSender<Command>);

impl Notifier {
    pub(crate) fn send(&self, command: Command) -> bool {
        match self.0.upgrade() {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }
}

pub struct SessionController {
    pub(crate) player: Arc<dyn RemotePlayer>,
    pub(crate) fetcher: RecommendationFetcher,
    pub(crate) scheduler: QueueScheduler,
    pub(crate) tokens: TokenStore,
    pub(crate) state: watch::Sender<PlaybackState>,
    /// Bumped on every connect/disconnect; completions tagged with an older epoch are dropped
    pub(crate) epoch: u64,
    pub(crate) connect_waiters: Vec<oneshot::Sender<Result<()>>>,
    pub(crate) listener: Option<JoinHandle<()>>,
    /// Last connect or disconnect task sent to the player; the next one waits for it
    pub(crate) lifecycle: Option<JoinHandle<()>>,
    pub(crate) art_in_flight: Option<TrackIdentifier>,
    pub(crate) album_art_size: u32,
    notifier: Notifier,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl SessionController {
    /// Spawns the actor and returns a handle to it
    pub fn spawn(
        player: Arc<dyn RemotePlayer>,
        fetcher: RecommendationFetcher,
        config: &Config,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlaybackState::default());

        let controller = Self {
            scheduler: QueueScheduler::new(player.clone(), config.enqueue_spacing, config.batch_policy),
            player,
            fetcher,
            tokens: TokenStore::new(),
            state: state_tx,
            epoch: 0,
            connect_waiters: Vec::new(),
            listener: None,
            lifecycle: None,
            art_in_flight: None,
            album_art_size: config.album_art_size,
            notifier: Notifier(tx.downgrade()),
            rx,
        };

        let task = tokio::spawn(controller.run());
        (SessionHandle { tx, state: state_rx }, task)
    }

    async fn run(mut self) {
        tracing::info!("Session controller started");

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::SetToken(token) => {
                    tracing::info!("Access token updated");
                    self.tokens.set(token);
                }
                Command::Connect(reply) => self.handle_connect(reply),
                Command::Disconnect(reply) => {
                    self.handle_disconnect();
                    let _ = reply.send(());
                }
                Command::PlayForMood { mood, genres, reply } => {
                    self.handle_play_for_mood(mood, genres, reply)
                }
                Command::PlayTrack(track) => self.handle_play_track(track),
                Command::TogglePlayPause => self.handle_toggle_play_pause(),
                Command::SkipNext => self.handle_skip(true),
                Command::SkipPrevious => self.handle_skip(false),
                Command::Shutdown => break,
                Command::ConnectFinished { epoch, result } => self.on_connect_finished(epoch, result),
                Command::PlayerStatePushed { epoch, state } => self.on_player_state(epoch, state),
                Command::ConnectionLost { epoch } => self.on_connection_lost(epoch),
                Command::AlbumArtFetched { epoch, track, result } => {
                    self.on_album_art(epoch, track, result)
                }
                Command::RecommendationsFetched { epoch, mood, result, reply } => {
                    self.on_recommendations(epoch, mood, result, reply)
                }
            }
        }

        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        tracing::info!("Session controller shutting down");
    }

    pub(crate) fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub(crate) fn connection(&self) -> ConnectionState {
        self.state.borrow().connection
    }

    pub(crate) fn set_connection(&self, connection: ConnectionState) {
        self.state.send_if_modified(|state| {
            if state.connection == connection {
                return false;
            }
            tracing::debug!(from = ?state.connection, to = ?connection, "Connection state changed");
            state.connection = connection;
            true
        });
    }
}

/// Cloneable entry point to the session actor
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlaybackState>,
}

fn session_closed() -> MoodifyError {
    MoodifyError::Connection("session controller is not running".to_string())
}

impl SessionHandle {
    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Dropping command: session controller is not running");
        }
    }

    /// Auth handoff: replaces the current token
    pub fn set_token(&self, token: AccessToken) {
        self.send(Command::SetToken(token));
    }

    /// Resolves once the player handshake completed (or failed)
    pub async fn connect(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Connect(reply)).map_err(|_| session_closed())?;
        rx.await.map_err(|_| session_closed())?
    }

    /// Stores `token` and connects with it, as after an auth redirect
    pub async fn connect_with_token(&self, token: AccessToken) -> Result<()> {
        self.set_token(token);
        self.connect().await
    }

    /// Resolves once local state and token have been reset
    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Disconnect(reply)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Fetches recommendations for `mood` and schedules them on the player queue
    pub async fn play_for_mood(
        &self,
        mood: impl Into<MoodLabel>,
        genres: Vec<String>,
    ) -> Result<BatchHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::PlayForMood {
                mood: mood.into(),
                genres,
                reply,
            })
            .map_err(|_| session_closed())?;
        rx.await.map_err(|_| session_closed())?
    }

    pub fn play_track(&self, track: TrackIdentifier) {
        self.send(Command::PlayTrack(track));
    }

    pub fn toggle_play_pause(&self) {
        self.send(Command::TogglePlayPause);
    }

    pub fn skip_next(&self) {
        self.send(Command::SkipNext);
    }

    pub fn skip_previous(&self) {
        self.send(Command::SkipPrevious);
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Snapshot of the current playback state
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every playback state change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }
}
