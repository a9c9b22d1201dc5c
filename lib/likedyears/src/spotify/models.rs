use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use shared::liked::{LikedEntry, LikedPage, Track};
use std::collections::HashMap;
use tracing::debug;

// Internal structs for deserializing raw API responses
#[derive(Deserialize, Debug)]
pub(crate) struct SavedTracksResponse {
    pub items: Vec<SavedTrackItem>,
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SavedTrackItem {
    pub added_at: DateTime<FixedOffset>,
    pub track: Option<TrackObject>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TrackObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    pub album: Option<AlbumObject>,
    pub duration_ms: Option<u32>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ArtistObject {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AlbumObject {
    pub name: String,
}

/// Formats the artists into a single, comma-separated string.
fn format_artists(artists: &[ArtistObject]) -> String {
    if artists.is_empty() {
        return "Unknown Artist".to_string();
    }
    artists
        .iter()
        .map(|artist| artist.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats a duration from milliseconds to a MM:SS string.
fn format_duration(duration_ms: Option<u32>) -> Option<String> {
    duration_ms.map(|ms| {
        let total_seconds = ms / 1000;
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        format!("{minutes:02}:{seconds:02}")
    })
}

impl TrackObject {
    fn into_track(self) -> Option<Track> {
        // Local files have no catalog id and cannot be deduplicated.
        let id = self.id?;
        Some(Track {
            id,
            artists: format_artists(&self.artists),
            album: self.album.map(|album| album.name),
            duration: format_duration(self.duration_ms),
            url: self.external_urls.get("spotify").cloned(),
            title: self.name,
        })
    }
}

impl SavedTracksResponse {
    pub(crate) fn into_page(self) -> LikedPage {
        let has_next = self.next.is_some();
        let entries = self
            .items
            .into_iter()
            .filter_map(|item| {
                let added_at = item.added_at;
                match item.track.and_then(TrackObject::into_track) {
                    Some(track) => Some(LikedEntry { track, added_at }),
                    None => {
                        debug!("Skipping saved item without a track id (added {added_at})");
                        None
                    }
                }
            })
            .collect();

        LikedPage { entries, has_next }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "href": "https://api.spotify.com/v1/me/tracks?offset=0&limit=3",
        "limit": 3,
        "offset": 0,
        "total": 7,
        "next": "https://api.spotify.com/v1/me/tracks?offset=3&limit=3",
        "previous": null,
        "items": [
            {
                "added_at": "2021-11-02T18:04:31Z",
                "track": {
                    "id": "4uLU6hMCjMI75M1A2tKUQC",
                    "name": "Never Gonna Give You Up",
                    "duration_ms": 213573,
                    "artists": [{ "name": "Rick Astley" }],
                    "album": { "name": "Whenever You Need Somebody" },
                    "external_urls": { "spotify": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC" }
                }
            },
            {
                "added_at": "2020-01-01T00:00:01Z",
                "track": {
                    "id": null,
                    "name": "my_local_file.mp3",
                    "artists": []
                }
            },
            {
                "added_at": "2019-12-31T23:59:59Z",
                "track": null
            }
        ]
    }"#;

    #[test]
    fn into_page_skips_items_without_identity() {
        let response: SavedTracksResponse = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(response.total, Some(7));

        let page = response.into_page();

        assert!(page.has_next);
        assert_eq!(page.entries.len(), 1);
        let entry = &page.entries[0];
        assert_eq!(entry.year_key(), "2021");
        assert_eq!(entry.track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(entry.track.artists, "Rick Astley");
        assert_eq!(entry.track.album.as_deref(), Some("Whenever You Need Somebody"));
        assert_eq!(entry.track.duration.as_deref(), Some("03:33"));
        assert!(entry.track.url.as_deref().unwrap().ends_with("4uLU6hMCjMI75M1A2tKUQC"));
    }

    #[test]
    fn last_page_has_no_next() {
        let response: SavedTracksResponse =
            serde_json::from_str(r#"{ "items": [], "next": null }"#).unwrap();

        let page = response.into_page();

        assert!(!page.has_next);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn artists_are_joined() {
        let artists = vec![
            ArtistObject {
                name: "Daft Punk".to_string(),
            },
            ArtistObject {
                name: "Pharrell Williams".to_string(),
            },
        ];
        assert_eq!(format_artists(&artists), "Daft Punk, Pharrell Williams");
        assert_eq!(format_artists(&[]), "Unknown Artist");
        assert_eq!(format_duration(Some(59_999)), Some("00:59".to_string()));
        assert_eq!(format_duration(None), None);
    }
}
