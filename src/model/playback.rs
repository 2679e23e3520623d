//! Locally observable playback state

use super::types::{AlbumArt, ConnectionState, TrackIdentifier};

pub const NO_TRACK_PLAYING: &str = "No track playing";

/// What observers see about the remote player.
///
/// Only the session actor writes it; everyone else reads a snapshot through
/// a watch channel.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub connection: ConnectionState,
    pub track_name: String,
    pub album_name: String,
    pub track_uri: Option<TrackIdentifier>,
    pub is_paused: bool,
    pub album_art: Option<AlbumArt>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            track_name: NO_TRACK_PLAYING.to_string(),
            album_name: String::new(),
            track_uri: None,
            is_paused: false,
            album_art: None,
        }
    }
}

impl PlaybackState {
    /// Back to the empty defaults, as after a disconnect
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Whether the loaded art (if any) belongs to the current track
    pub fn has_art_for_current_track(&self) -> bool {
        match (&self.album_art, &self.track_uri) {
            (Some(art), Some(uri)) => &art.track == uri,
            _ => false,
        }
    }
}
