//! Centralized configuration management.
//!
//! All environment variables are loaded and validated at startup through this module.

use crate::error::{LikedYearsError, Result};
use crate::spotify::{SpotifyClient, SpotifyClientBuilder};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OAuth bearer token for the Spotify Web API (required)
    pub spotify_access_token: String,
    /// Spotify API base URL (default: "https://api.spotify.com")
    pub spotify_api_url: String,
    /// Liked tracks per page (default: 50)
    pub page_size: u32,
    /// Per-request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            spotify_access_token: lookup("SPOTIFY_ACCESS_TOKEN")
                .filter(|token| !token.trim().is_empty())
                .ok_or(LikedYearsError::MissingEnv("SPOTIFY_ACCESS_TOKEN"))?,
            spotify_api_url: lookup("SPOTIFY_API_URL")
                .unwrap_or_else(|| "https://api.spotify.com".to_string()),
            page_size: lookup("LIKED_PAGE_SIZE")
                .and_then(|p| p.parse().ok())
                .unwrap_or(50),
            request_timeout_secs: lookup("SPOTIFY_REQUEST_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Build a Spotify client from this configuration.
    pub fn spotify_client(&self) -> Result<SpotifyClient> {
        SpotifyClientBuilder::new()
            .base_url(&self.spotify_api_url)
            .access_token(&self.spotify_access_token)
            .page_size(self.page_size)
            .request_timeout(self.request_timeout_secs)
            .build()
    }
}
