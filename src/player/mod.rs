//! Remote player abstraction
//!
//! The session depends on exactly these primitives. `spotify` provides an
//! implementation over the Spotify Web API; tests use in-memory fakes.

mod spotify;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::model::{AccessToken, AlbumArt, TrackIdentifier};

pub use spotify::SpotifyPlayer;

/// Stream of pushed player states. The stream ending means the connection was lost.
pub type PlayerStateStream = mpsc::UnboundedReceiver<PlayerState>;

/// Cover image variant advertised by the player for a track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtworkRef {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Track as reported in a player state push
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerTrack {
    pub uri: TrackIdentifier,
    pub name: String,
    pub album: String,
    pub artwork: Vec<ArtworkRef>,
}

impl PlayerTrack {
    /// Artwork variant whose width is closest to `size`
    pub fn artwork_closest_to(&self, size: u32) -> Option<&ArtworkRef> {
        self.artwork
            .iter()
            .min_by_key(|a| a.width.unwrap_or(0).abs_diff(size))
    }
}

/// Snapshot pushed by the remote player
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PlayerState {
    pub track: Option<PlayerTrack>,
    pub is_paused: bool,
}

#[async_trait]
pub trait RemotePlayer: Send + Sync {
    /// Handshake with the player using `token`
    async fn connect(&self, token: &AccessToken) -> Result<()>;

    async fn disconnect(&self);

    /// Start receiving pushed player states
    async fn subscribe(&self) -> Result<PlayerStateStream>;

    /// One-off read of the current player state
    async fn player_state(&self) -> Result<PlayerState>;

    async fn play(&self, track: &TrackIdentifier) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    async fn skip_next(&self) -> Result<()>;

    async fn skip_previous(&self) -> Result<()>;

    /// Append `track` to the play queue
    async fn enqueue(&self, track: &TrackIdentifier) -> Result<()>;

    /// Download cover art for `track`, as close as possible to `size` pixels wide
    async fn fetch_image(&self, track: &PlayerTrack, size: u32) -> Result<AlbumArt>;
}
