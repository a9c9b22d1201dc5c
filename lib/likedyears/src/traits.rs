use async_trait::async_trait;
use shared::liked::LikedPage;
use std::sync::Arc;

use crate::error::Result;

/// A catalog that can list the user's liked tracks one page at a time.
///
/// Pages are numbered from 1. Any `Err` is treated by the aggregator as a
/// fetch failure that ends pagination.
#[async_trait]
pub trait TrackSource: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn fetch_page(&self, cursor: u32) -> Result<LikedPage>;
}

#[async_trait]
impl<T: TrackSource + ?Sized> TrackSource for Arc<T> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_page(&self, cursor: u32) -> Result<LikedPage> {
        (**self).fetch_page(cursor).await
    }
}

#[async_trait]
impl<T: TrackSource + ?Sized> TrackSource for Box<T> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_page(&self, cursor: u32) -> Result<LikedPage> {
        (**self).fetch_page(cursor).await
    }
}
