//! Model module - session state and data types
//!
//! - `types`: track identifiers, connection state, album art
//! - `playback`: observable playback state
//! - `token`: access token storage

mod types;
mod playback;
mod token;

pub use types::{AlbumArt, ConnectionState, TrackIdentifier};

pub use playback::{PlaybackState, NO_TRACK_PLAYING};

pub use token::{AccessToken, TokenStore};
