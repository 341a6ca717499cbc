//! Debounced search-as-you-type
//!
//! Each keystroke starts a lookup with a fresh generation number. A lookup
//! whose generation is no longer the latest, after the debounce or after
//! its fetch, yields nothing, so a slow answer to an old query never
//! replaces the answer to a newer one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct LatestLookup {
    generation: Arc<AtomicU64>,
    debounce: Duration,
}

impl LatestLookup {
    pub fn new(debounce: Duration) -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Wait out the debounce, then fetch. `None` when superseded.
    pub async fn run<F, Fut, T>(&self, fetch: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(ticket) {
            tracing::trace!("Lookup {} superseded before fetch", ticket);
            return None;
        }

        let result = fetch().await;
        if !self.is_current(ticket) {
            tracing::trace!("Lookup {} superseded during fetch", ticket);
            return None;
        }

        Some(result)
    }

    /// Invalidate any lookup in flight
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
