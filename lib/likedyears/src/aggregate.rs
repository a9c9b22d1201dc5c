//! Incremental aggregation of liked tracks into per-year buckets.
//!
//! [`AggregateState`] holds everything a single session accumulates: the
//! year mapping, the set of track ids already placed, and the completion flag.
//! [`TrackAggregator`] drives a [`TrackSource`] page by page and merges each
//! page into that state, one await per page.

use futures::{stream, Stream};
use shared::liked::{LikedEntry, LikedTracksSnapshot, TracksByYear};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LikedYearsError;
use crate::traits::TrackSource;

/// Cumulative per-year state for one aggregation session.
#[derive(Debug, Default)]
pub struct AggregateState {
    by_year: TracksByYear,
    seen: HashSet<String>,
    complete: bool,
    pages: u32,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one page of entries, in page order, and return how many tracks
    /// were added.
    ///
    /// Tracks whose id has been seen before (in an earlier page or earlier in
    /// this one) are skipped. The page is bucketed on the side first, so the
    /// state only ever moves from one whole page to the next.
    pub fn merge_page(&mut self, entries: Vec<LikedEntry>) -> usize {
        let mut batch: HashMap<String, Vec<_>> = HashMap::new();
        let mut added = 0;

        for entry in entries {
            if !self.seen.insert(entry.track.id.clone()) {
                debug!("Skipping already seen track {}", entry.track.id);
                continue;
            }
            batch.entry(entry.year_key()).or_default().push(Arc::new(entry.track));
            added += 1;
        }

        for (year, tracks) in batch {
            self.by_year.entry(year).or_default().extend(tracks);
        }
        self.pages += 1;

        added
    }

    /// Flip the completion flag. Returns false if it was already set.
    pub fn mark_complete(&mut self) -> bool {
        !std::mem::replace(&mut self.complete, true)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.seen.contains(track_id)
    }

    pub fn by_year(&self) -> &TracksByYear {
        &self.by_year
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn snapshot(&self) -> LikedTracksSnapshot {
        LikedTracksSnapshot {
            by_year: self.by_year.clone(),
            complete: self.complete,
            pages: self.pages,
        }
    }
}

/// How an aggregation run ended.
///
/// Observers of the snapshot stream cannot tell `Halted` from a run that is
/// still loading; this value is only handed to whoever drove the run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed { pages: u32 },
    Halted { page: u32, error: LikedYearsError },
    Cancelled { page: u32 },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

enum Phase {
    Fetch,
    Finish,
    Done,
}

/// Fetches liked tracks page by page and folds them into an
/// [`AggregateState`].
pub struct TrackAggregator<S> {
    source: S,
    state: AggregateState,
    cursor: u32,
    cancellation_token: CancellationToken,
}

impl<S: TrackSource> TrackAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: AggregateState::new(),
            cursor: 1,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Stop merging once `token` is cancelled. A fetch already in flight is
    /// still awaited, but its page is thrown away.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn snapshot(&self) -> LikedTracksSnapshot {
        self.state.snapshot()
    }

    /// Fetch the page at the cursor and merge it.
    /// Returns whether the source has another page.
    async fn advance(&mut self) -> Result<bool, RunOutcome> {
        let page_number = self.cursor;
        if self.cancellation_token.is_cancelled() {
            return Err(RunOutcome::Cancelled { page: page_number });
        }

        debug!("Fetching liked tracks page {} from {}", page_number, self.source.name());
        let result = self.source.fetch_page(page_number).await;

        if self.cancellation_token.is_cancelled() {
            info!("Session cancelled, discarding page {}", page_number);
            return Err(RunOutcome::Cancelled { page: page_number });
        }

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                warn!(
                    "Error fetching liked tracks page {} from {}: {}",
                    page_number,
                    self.source.name(),
                    error
                );
                return Err(RunOutcome::Halted {
                    page: page_number,
                    error,
                });
            }
        };

        let received = page.entries.len();
        let added = self.state.merge_page(page.entries);
        debug!(
            "Merged page {}: {} entries, {} new tracks",
            page_number, received, added
        );

        if page.has_next {
            self.cursor += 1;
        }
        Ok(page.has_next)
    }

    fn finish(&mut self) {
        if self.state.mark_complete() {
            info!(
                "Finished loading liked tracks from {} ({} pages)",
                self.source.name(),
                self.state.pages()
            );
        }
    }

    /// Run pagination to the end, handing every snapshot to `on_update`.
    ///
    /// A snapshot follows each merged page. The last page is followed by one
    /// more snapshot with `complete` set. Fetch failures end the run without
    /// touching the state.
    pub async fn run<F>(&mut self, mut on_update: F) -> RunOutcome
    where
        F: FnMut(LikedTracksSnapshot),
    {
        loop {
            if self.state.is_complete() {
                return RunOutcome::Completed {
                    pages: self.state.pages(),
                };
            }

            match self.advance().await {
                Ok(true) => on_update(self.state.snapshot()),
                Ok(false) => {
                    on_update(self.state.snapshot());
                    self.finish();
                    on_update(self.state.snapshot());
                }
                Err(outcome) => return outcome,
            }
        }
    }

    /// The same run as [`TrackAggregator::run`], as a lazy stream of
    /// snapshots. Nothing is fetched until the stream is polled, and dropping
    /// it stops pagination.
    pub fn updates(self) -> impl Stream<Item = LikedTracksSnapshot> {
        let phase = if self.state.is_complete() {
            Phase::Done
        } else {
            Phase::Fetch
        };

        stream::unfold((self, phase), |(mut aggregator, phase)| async move {
            match phase {
                Phase::Done => None,
                Phase::Finish => {
                    aggregator.finish();
                    let snapshot = aggregator.state.snapshot();
                    Some((snapshot, (aggregator, Phase::Done)))
                }
                Phase::Fetch => match aggregator.advance().await {
                    Ok(has_next) => {
                        let snapshot = aggregator.state.snapshot();
                        let next = if has_next { Phase::Fetch } else { Phase::Finish };
                        Some((snapshot, (aggregator, next)))
                    }
                    Err(_) => None,
                },
            }
        })
    }
}
