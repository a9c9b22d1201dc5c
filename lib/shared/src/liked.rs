use chrono::{DateTime, Datelike, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Year key (4-digit year, e.g. "2021") mapped to the tracks liked that year,
/// in discovery order. Tracks are shared so snapshots only copy pointers.
pub type TracksByYear = HashMap<String, Vec<Arc<Track>>>;

/// A track from the user's catalog. Everything but `id` is display metadata
/// and is carried through untouched.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: String,
    pub album: Option<String>,
    pub duration: Option<String>,
    pub url: Option<String>,
}

/// A track paired with the moment the user liked it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct LikedEntry {
    pub track: Track,
    pub added_at: DateTime<FixedOffset>,
}

impl LikedEntry {
    pub fn year_key(&self) -> String {
        year_key(&self.added_at)
    }
}

/// One page of liked entries as returned by a track source.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct LikedPage {
    pub entries: Vec<LikedEntry>,
    pub has_next: bool,
}

/// What observers of an aggregation session see: the per-year mapping and
/// whether pagination has finished.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct LikedTracksSnapshot {
    pub by_year: TracksByYear,
    pub complete: bool,
    pub pages: u32,
}

impl LikedTracksSnapshot {
    pub fn years(&self) -> Vec<String> {
        years(&self.by_year)
    }

    pub fn tracks_for_year(&self, year: &str) -> &[Arc<Track>] {
        tracks_for_year(&self.by_year, year)
    }

    pub fn track_count(&self) -> usize {
        self.by_year.values().map(Vec::len).sum()
    }
}

/// Year bucket key for a timestamp, read in the offset the timestamp was
/// issued in. Sub-second parts never matter.
pub fn year_key(added_at: &DateTime<FixedOffset>) -> String {
    format!("{:04}", added_at.year())
}

/// Year keys present in `by_year`, most recent first.
pub fn years(by_year: &TracksByYear) -> Vec<String> {
    let mut years: Vec<String> = by_year.keys().cloned().collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years
}

/// Tracks liked in `year`, or an empty slice when nothing was liked that year.
pub fn tracks_for_year<'a>(by_year: &'a TracksByYear, year: &str) -> &'a [Arc<Track>] {
    by_year.get(year).map(Vec::as_slice).unwrap_or(&[])
}
