//! A running aggregation session.
//!
//! The session owns its [`TrackAggregator`] on a tokio task and publishes the
//! latest snapshot on a watch channel. Views subscribe to it and stop the
//! session when they go away.

use shared::liked::{LikedTracksSnapshot, Track};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregate::{RunOutcome, TrackAggregator};
use crate::error::Result;
use crate::traits::TrackSource;

pub struct LikedTracksSession;

impl LikedTracksSession {
    /// Start paginating `source` on a new task. Must be called from within a
    /// tokio runtime.
    pub fn spawn<S>(source: S) -> SessionHandle
    where
        S: TrackSource + 'static,
    {
        let (tx, rx) = watch::channel(LikedTracksSnapshot::default());
        let cancellation_token = CancellationToken::new();
        let source_name = source.name();

        let mut aggregator =
            TrackAggregator::new(source).with_cancellation(cancellation_token.clone());

        let task = tokio::spawn(async move {
            info!("Starting liked tracks session for {}", source_name);
            let outcome = aggregator
                .run(|snapshot| {
                    tx.send_replace(snapshot);
                })
                .await;
            info!("Liked tracks session for {} ended: {:?}", source_name, outcome);
            outcome
        });

        SessionHandle {
            rx,
            cancellation_token,
            task,
        }
    }
}

/// Handle held by the consumer of a session. Dropping it cancels the session.
pub struct SessionHandle {
    rx: watch::Receiver<LikedTracksSnapshot>,
    cancellation_token: CancellationToken,
    task: JoinHandle<RunOutcome>,
}

impl SessionHandle {
    /// Receiver that always holds the most recent snapshot.
    pub fn subscribe(&self) -> watch::Receiver<LikedTracksSnapshot> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> LikedTracksSnapshot {
        self.rx.borrow().clone()
    }

    pub fn is_complete(&self) -> bool {
        self.rx.borrow().complete
    }

    pub fn years(&self) -> Vec<String> {
        self.rx.borrow().years()
    }

    pub fn tracks_for_year(&self, year: &str) -> Vec<Arc<Track>> {
        self.rx.borrow().tracks_for_year(year).to_vec()
    }

    /// Ask the session to stop. A page already being fetched is awaited and
    /// then dropped without being merged.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Wait for the session task to end.
    pub async fn join(mut self) -> Result<RunOutcome> {
        Ok((&mut self.task).await?)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{entry, page, ScriptedSource};
    use crate::error::LikedYearsError;
    use async_trait::async_trait;
    use shared::liked::LikedPage;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Serves page 1 immediately, then holds page 2 until the gate opens.
    /// Every page but the third says more follow.
    #[derive(Default)]
    struct GatedSource {
        started: Arc<Notify>,
        gate: Arc<Notify>,
        requested: Arc<Mutex<Vec<u32>>>,
    }

    impl GatedSource {
        fn handles(&self) -> (Arc<Notify>, Arc<Notify>, Arc<Mutex<Vec<u32>>>) {
            (
                self.started.clone(),
                self.gate.clone(),
                self.requested.clone(),
            )
        }
    }

    #[async_trait]
    impl TrackSource for GatedSource {
        fn id(&self) -> &'static str {
            "gated"
        }

        fn name(&self) -> &'static str {
            "Gated"
        }

        async fn fetch_page(&self, cursor: u32) -> Result<LikedPage> {
            self.requested.lock().unwrap().push(cursor);
            match cursor {
                1 => Ok(page(vec![entry("a", "2020-01-01T00:00:00Z")], true)),
                2 => {
                    self.started.notify_one();
                    self.gate.notified().await;
                    Ok(page(vec![entry("b", "2021-01-01T00:00:00Z")], true))
                }
                _ => Ok(page(vec![entry("c", "2022-01-01T00:00:00Z")], false)),
            }
        }
    }

    #[tokio::test]
    async fn session_publishes_final_snapshot() {
        let source = ScriptedSource::new(vec![
            Ok(page(
                vec![
                    entry("trackA", "2020-01-01T00:00:00Z"),
                    entry("trackB", "2021-01-01T00:00:00Z"),
                ],
                true,
            )),
            Ok(page(
                vec![
                    entry("trackB", "2021-01-01T00:00:00Z"),
                    entry("trackC", "2020-06-01T00:00:00Z"),
                ],
                false,
            )),
        ]);
        let handle = LikedTracksSession::spawn(source);
        let mut rx = handle.subscribe();

        rx.wait_for(|snapshot| snapshot.complete).await.unwrap();

        assert!(handle.is_complete());
        assert_eq!(handle.years(), vec!["2021", "2020"]);
        let ids: Vec<_> = handle
            .tracks_for_year("2020")
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(ids, vec!["trackA", "trackC"]);
        assert!(handle.tracks_for_year("1990").is_empty());

        let outcome = handle.join().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed { pages: 2 }));
    }

    #[tokio::test]
    async fn failed_session_never_completes() {
        let source = ScriptedSource::new(vec![
            Ok(page(vec![entry("a", "2020-01-01T00:00:00Z")], true)),
            Err(LikedYearsError::Timeout(30)),
        ]);
        let handle = LikedTracksSession::spawn(source);
        let rx = handle.subscribe();

        let outcome = handle.join().await.unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Halted {
                page: 2,
                error: LikedYearsError::Timeout(30)
            }
        ));
        let snapshot = rx.borrow().clone();
        assert!(!snapshot.complete);
        assert_eq!(snapshot.pages, 1);
        assert_eq!(snapshot.years(), vec!["2020"]);
    }

    #[tokio::test]
    async fn stopped_session_discards_in_flight_page() {
        let source = GatedSource::default();
        let (started, gate, requested) = source.handles();
        let handle = LikedTracksSession::spawn(source);
        let rx = handle.subscribe();

        started.notified().await;
        handle.stop();
        gate.notify_one();
        assert!(handle.is_stopped());

        let outcome = handle.join().await.unwrap();

        assert!(matches!(outcome, RunOutcome::Cancelled { page: 2 }));
        let snapshot = rx.borrow().clone();
        assert!(!snapshot.complete);
        assert_eq!(snapshot.years(), vec!["2020"]);
        assert!(snapshot.tracks_for_year("2021").is_empty());
        assert_eq!(*requested.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn dropped_handle_discards_in_flight_page() {
        let source = GatedSource::default();
        let (started, gate, requested) = source.handles();
        let handle = LikedTracksSession::spawn(source);
        let mut rx = handle.subscribe();

        started.notified().await;
        drop(handle);
        gate.notify_one();

        // The sender goes away once the task has ended.
        while rx.changed().await.is_ok() {}

        let snapshot = rx.borrow().clone();
        assert!(!snapshot.complete);
        assert_eq!(snapshot.pages, 1);
        assert_eq!(snapshot.years(), vec!["2020"]);
        assert!(snapshot.tracks_for_year("2021").is_empty());
        assert_eq!(*requested.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn independent_sessions_do_not_share_state() {
        let first = LikedTracksSession::spawn(ScriptedSource::new(vec![Ok(page(
            vec![entry("a", "2020-01-01T00:00:00Z")],
            false,
        ))]));
        let second = LikedTracksSession::spawn(ScriptedSource::new(vec![Ok(page(
            vec![entry("a", "2022-01-01T00:00:00Z")],
            false,
        ))]));
        let first_rx = first.subscribe();
        let second_rx = second.subscribe();

        first.join().await.unwrap();
        second.join().await.unwrap();

        assert_eq!(first_rx.borrow().years(), vec!["2020"]);
        assert_eq!(second_rx.borrow().years(), vec!["2022"]);
    }
}
