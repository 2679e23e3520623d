//! Rate-limited submission of recommended tracks to the remote player queue

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::Instant;

use crate::config::BatchPolicy;
use crate::model::TrackIdentifier;
use crate::player::RemotePlayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// Outcome of a batch once every dispatched enqueue has completed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub enqueued: Vec<TrackIdentifier>,
    pub failed: Vec<TrackIdentifier>,
}

/// Handle to a scheduled batch. Dropping it does not cancel the batch.
#[derive(Debug)]
pub struct BatchHandle {
    pub id: BatchId,
    pub len: usize,
    join: JoinHandle<BatchReport>,
}

impl BatchHandle {
    /// Waits for the batch; errors if the batch was superseded before finishing
    pub async fn finished(self) -> std::result::Result<BatchReport, JoinError> {
        self.join.await
    }
}

/// Submits track lists to the player one at a time.
///
/// Track `i` of a batch is dispatched at `start + i * spacing`. Each enqueue
/// runs as its own task: a failure is logged and never stops the rest.
pub struct QueueScheduler {
    player: Arc<dyn RemotePlayer>,
    spacing: Duration,
    policy: BatchPolicy,
    next_id: u64,
    pending: Vec<(BatchId, AbortHandle)>,
}

impl QueueScheduler {
    pub fn new(player: Arc<dyn RemotePlayer>, spacing: Duration, policy: BatchPolicy) -> Self {
        Self {
            player,
            spacing,
            policy,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, tracks: Vec<TrackIdentifier>) -> BatchHandle {
        self.pending.retain(|(_, handle)| !handle.is_finished());
        if self.policy == BatchPolicy::Supersede {
            self.cancel_pending();
        }

        self.next_id += 1;
        let id = BatchId(self.next_id);
        let len = tracks.len();
        let start = Instant::now();

        tracing::info!(batch = %id, tracks = len, spacing_ms = self.spacing.as_millis() as u64, "Scheduling enqueue batch");

        let join = tokio::spawn(run_batch(id, self.player.clone(), tracks, start, self.spacing));
        self.pending.push((id, join.abort_handle()));

        BatchHandle { id, len, join }
    }

    /// Aborts the not-yet-dispatched enqueues of every pending batch.
    /// Enqueues already handed to the player still complete.
    pub fn cancel_pending(&mut self) {
        for (id, handle) in self.pending.drain(..) {
            if !handle.is_finished() {
                tracing::info!(batch = %id, "Superseding pending batch");
                handle.abort();
            }
        }
    }

    pub fn pending_batches(&self) -> Vec<BatchId> {
        self.pending
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| *id)
            .collect()
    }
}

async fn run_batch(
    id: BatchId,
    player: Arc<dyn RemotePlayer>,
    tracks: Vec<TrackIdentifier>,
    start: Instant,
    spacing: Duration,
) -> BatchReport {
    let mut dispatched = Vec::with_capacity(tracks.len());

    for (index, track) in tracks.into_iter().enumerate() {
        tokio::time::sleep_until(start + spacing * index as u32).await;

        let player = player.clone();
        dispatched.push(tokio::spawn(async move {
            match player.enqueue(&track).await {
                Ok(()) => {
                    tracing::debug!(batch = %id, index, uri = %track, "Enqueued track");
                    Ok(track)
                }
                Err(e) => {
                    tracing::warn!(batch = %id, index, uri = %track, error = %e, "Failed to enqueue track");
                    Err(track)
                }
            }
        }));
    }

    let mut report = BatchReport::default();
    for outcome in futures::future::join_all(dispatched).await {
        match outcome {
            Ok(Ok(track)) => report.enqueued.push(track),
            Ok(Err(track)) => report.failed.push(track),
            Err(e) => tracing::error!(batch = %id, error = %e, "Enqueue task panicked"),
        }
    }

    tracing::info!(
        batch = %id,
        enqueued = report.enqueued.len(),
        failed = report.failed.len(),
        "Batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MoodifyError, Result};
    use crate::model::{AccessToken, AlbumArt};
    use crate::player::{PlayerState, PlayerStateStream, PlayerTrack};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every enqueue with its time offset; rejects URIs containing "bad"
    struct RecordingPlayer {
        origin: Instant,
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl RecordingPlayer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                origin: Instant::now(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemotePlayer for RecordingPlayer {
        async fn connect(&self, _token: &AccessToken) -> Result<()> {
            Ok(())
        }
        async fn disconnect(&self) {}
        async fn subscribe(&self) -> Result<PlayerStateStream> {
            Err(MoodifyError::Connection("unsupported".into()))
        }
        async fn player_state(&self) -> Result<PlayerState> {
            Ok(PlayerState::default())
        }
        async fn play(&self, _track: &TrackIdentifier) -> Result<()> {
            Ok(())
        }
        async fn pause(&self) -> Result<()> {
            Ok(())
        }
        async fn resume(&self) -> Result<()> {
            Ok(())
        }
        async fn skip_next(&self) -> Result<()> {
            Ok(())
        }
        async fn skip_previous(&self) -> Result<()> {
            Ok(())
        }
        async fn enqueue(&self, track: &TrackIdentifier) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((track.to_string(), self.origin.elapsed()));
            if track.as_str().contains("bad") {
                return Err(MoodifyError::Enqueue {
                    track: track.to_string(),
                    reason: "rejected".into(),
                });
            }
            Ok(())
        }
        async fn fetch_image(&self, _track: &PlayerTrack, _size: u32) -> Result<AlbumArt> {
            Err(MoodifyError::Connection("unsupported".into()))
        }
    }

    fn uris(list: &[&str]) -> Vec<TrackIdentifier> {
        list.iter().map(|u| TrackIdentifier::from(*u)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn enqueues_in_order_at_fixed_offsets() {
        let player = RecordingPlayer::new();
        let mut scheduler =
            QueueScheduler::new(player.clone(), Duration::from_millis(500), BatchPolicy::Coexist);

        let report = scheduler
            .schedule(uris(&["a", "b", "c"]))
            .finished()
            .await
            .unwrap();

        assert_eq!(
            player.calls(),
            vec![
                ("a".to_string(), Duration::from_millis(0)),
                ("b".to_string(), Duration::from_millis(500)),
                ("c".to_string(), Duration::from_millis(1000)),
            ]
        );
        assert_eq!(report.enqueued, uris(&["a", "b", "c"]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_enqueue_does_not_stop_the_batch() {
        let player = RecordingPlayer::new();
        let mut scheduler =
            QueueScheduler::new(player.clone(), Duration::from_millis(500), BatchPolicy::Coexist);

        let report = scheduler
            .schedule(uris(&["a", "bad", "c"]))
            .finished()
            .await
            .unwrap();

        assert_eq!(player.calls().len(), 3);
        assert_eq!(report.enqueued, uris(&["a", "c"]));
        assert_eq!(report.failed, uris(&["bad"]));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_finishes_immediately() {
        let player = RecordingPlayer::new();
        let mut scheduler =
            QueueScheduler::new(player.clone(), Duration::from_millis(500), BatchPolicy::Coexist);

        let report = scheduler.schedule(Vec::new()).finished().await.unwrap();
        assert_eq!(report, BatchReport::default());
        assert!(player.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_batch_supersedes_pending_one() {
        let player = RecordingPlayer::new();
        let mut scheduler =
            QueueScheduler::new(player.clone(), Duration::from_millis(500), BatchPolicy::Supersede);

        let first = scheduler.schedule(uris(&["a1", "a2", "a3"]));
        tokio::time::sleep(Duration::from_millis(600)).await;
        let second = scheduler.schedule(uris(&["b1", "b2"]));

        assert!(first.finished().await.unwrap_err().is_cancelled());
        second.finished().await.unwrap();

        let names: Vec<String> = player.calls().into_iter().map(|(u, _)| u).collect();
        assert_eq!(names, vec!["a1", "a2", "b1", "b2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn coexisting_batches_interleave() {
        let player = RecordingPlayer::new();
        let mut scheduler =
            QueueScheduler::new(player.clone(), Duration::from_millis(500), BatchPolicy::Coexist);

        let first = scheduler.schedule(uris(&["a1", "a2"]));
        tokio::time::sleep(Duration::from_millis(250)).await;
        let second = scheduler.schedule(uris(&["b1", "b2"]));
        assert_eq!(scheduler.pending_batches().len(), 2);

        first.finished().await.unwrap();
        second.finished().await.unwrap();

        let calls = player.calls();
        let names: Vec<&str> = calls.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(names, vec!["a1", "b1", "a2", "b2"]);
        assert_eq!(calls[1].1, Duration::from_millis(250));
        assert_eq!(calls[3].1, Duration::from_millis(750));
    }
}
