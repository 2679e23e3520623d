//! Moodify: turns a detected mood and genre preferences into a queue of
//! recommended tracks on a remote player, and keeps a local view of what the
//! player is doing.
//!
//! Flow: mood label -> [`mood::feature_profile`] -> [`recommendations::RecommendationRequest`]
//! -> [`recommendations::RecommendationFetcher`] -> [`queue::QueueScheduler`] -> player.
//! Player pushes flow back into [`controller::SessionController`], which owns
//! the observable [`model::PlaybackState`].

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod model;
pub mod mood;
pub mod player;
pub mod queue;
pub mod recommendations;

pub use config::Config;
pub use controller::{SessionController, SessionHandle};
pub use error::{MoodifyError, Result};
pub use model::{AccessToken, PlaybackState, TrackIdentifier};
pub use mood::MoodLabel;
