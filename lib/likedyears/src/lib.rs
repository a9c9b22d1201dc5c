pub mod aggregate;
pub mod config;
pub mod error;
pub mod session;
pub mod spotify;
pub mod traits;

pub use aggregate::{AggregateState, RunOutcome, TrackAggregator};
pub use config::AppConfig;
pub use error::{LikedYearsError, Result};
pub use session::{LikedTracksSession, SessionHandle};
pub use spotify::{SpotifyClient, SpotifyClientBuilder};
pub use traits::TrackSource;
