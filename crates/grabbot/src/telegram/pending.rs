//! Links waiting for a format choice.
//!
//! When a user posts a link the bot answers with an audio/video keyboard.
//! The button's callback data only carries a short id; the URL itself lives
//! here until the user picks a format or the entry expires.

use moka::future::Cache;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Length of a pending-link id in callback data
pub const PENDING_ID_LEN: usize = 12;

const MAX_PENDING_LINKS: u64 = 10_000;

#[derive(Clone)]
pub struct PendingLinks {
    cache: Cache<String, Url>,
}

impl PendingLinks {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_PENDING_LINKS)
    }

    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).time_to_live(ttl).build();
        Self { cache }
    }

    /// Stores `url` and returns the id to put into callback data.
    pub async fn insert(&self, url: Url) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(PENDING_ID_LEN);
        self.cache.insert(id.clone(), url).await;
        id
    }

    /// Looks the link up without consuming it, so both formats can be
    /// requested from the same keyboard.
    pub async fn get(&self, id: &str) -> Option<Url> {
        self.cache.get(id).await
    }

    /// Approximate; moka applies inserts lazily.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
