use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use moodify::mood::{feature_profile, MoodLabel};
use moodify::player::SpotifyPlayer;
use moodify::recommendations::{genres, RecommendationFetcher};
use moodify::{logging, AccessToken, Config, SessionController};

/// Grace period for the last pushes after the queue batch drains
const SETTLE_TIME: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "moodify", about = "Mood-driven Spotify queueing", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch recommendations for a mood and queue them on the active player
    Play {
        /// Detected mood (happy, sad, angry, neutral, surprise, disgust, fear)
        #[arg(short, long)]
        mood: String,
        /// Preferred genre; repeat for several (first five are used)
        #[arg(short, long = "genre", required = true)]
        genres: Vec<String>,
        /// OAuth access token obtained by an external authorization flow
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// List the supported genre vocabulary
    Genres,
    /// Print the audio feature profile for a mood as JSON
    Mood { label: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Genres => {
            for genre in genres::SUPPORTED_GENRES {
                println!("{}", genre);
            }
            Ok(())
        }
        Command::Mood { label } => {
            let profile = feature_profile(&MoodLabel::parse(&label));
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Command::Play { mood, genres, token } => play(mood, genres, token).await,
    }
}

async fn play(mood: String, genre_list: Vec<String>, token: String) -> Result<()> {
    let config = Config::from_env();
    let _log_guard = match logging::init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("=== Moodify Starting ===");

    for genre in genre_list.iter().filter(|g| !genres::is_supported(g)) {
        tracing::warn!(genre = %genre, "Genre is not in the supported vocabulary");
        eprintln!("Warning: '{}' is not a known genre", genre);
    }

    let player = Arc::new(SpotifyPlayer::new(&config));
    let fetcher = RecommendationFetcher::new(&config);
    let (session, task) = SessionController::spawn(player, fetcher, &config);

    session.connect_with_token(AccessToken::new(token)).await?;
    println!("Connected to Spotify");

    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            println!(
                "{} - {}{}{}",
                state.track_name,
                state.album_name,
                if state.is_paused { " (paused)" } else { "" },
                if state.album_art.is_some() { " [art]" } else { "" },
            );
        }
    });

    let label = MoodLabel::parse(&mood);
    let result = match session.play_for_mood(label.clone(), genre_list).await {
        Ok(batch) => {
            println!("Queueing {} tracks for mood '{}'", batch.len, label);
            match batch.finished().await {
                Ok(report) => {
                    println!(
                        "Queued {} tracks ({} failed)",
                        report.enqueued.len(),
                        report.failed.len()
                    );
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!("queue batch did not finish: {}", e)),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Mood playback failed");
            Err(e.into())
        }
    };

    tokio::time::sleep(SETTLE_TIME).await;
    session.disconnect().await;
    session.shutdown();
    let _ = task.await;
    printer.abort();

    tracing::info!("Moodify shutting down");
    result
}
