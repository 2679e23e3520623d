//! Core type definitions shared by the fetcher, scheduler and player

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a playable track in the remote catalog (e.g. `spotify:track:...`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackIdentifier(String);

impl TrackIdentifier {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing id segment of a `scheme:kind:id` URI, or the whole value otherwise
    pub fn id(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TrackIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackIdentifier {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for TrackIdentifier {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// Player connection lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Downloaded cover image for the current track
#[derive(Clone, PartialEq, Eq)]
pub struct AlbumArt {
    pub track: TrackIdentifier,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AlbumArt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlbumArt")
            .field("track", &self.track)
            .field("url", &self.url)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
