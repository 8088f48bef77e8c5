//! TTL'd cache of events whose start-time correction has already been
//! applied this cycle, so the pre-start sweep doesn't reissue the same
//! correction on every tick while an event sits in the window.
//!
//! An `Arc<RwLock<HashMap<...>>>` with a periodic sweep, time-based rather
//! than request-coalescing: an entry expires once its TTL elapses rather
//! than once it's been read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone)]
pub struct CorrectionCache {
    inner: Arc<RwLock<HashMap<i64, Instant>>>,
    ttl: Duration,
}

impl CorrectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    pub async fn was_recently_corrected(&self, event_id: i64) -> bool {
        let cache = self.inner.read().await;
        matches!(cache.get(&event_id), Some(at) if at.elapsed() < self.ttl)
    }

    pub async fn mark_corrected(&self, event_id: i64) {
        self.inner.write().await.insert(event_id, Instant::now());
    }

    /// Drop entries past their TTL; called periodically from a background
    /// task so the map doesn't grow without bound across a long-running
    /// process.
    pub async fn sweep(&self) {
        let mut cache = self.inner.write().await;
        let ttl = self.ttl;
        let before = cache.len();
        cache.retain(|_, at| at.elapsed() < ttl);
        let removed = before - cache.len();
        if removed > 0 {
            info!("correction cache sweep removed {} expired entries", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_and_reports_recent_correction() {
        let cache = CorrectionCache::new(Duration::from_secs(3600));
        assert!(!cache.was_recently_corrected(1).await);
        cache.mark_corrected(1).await;
        assert!(cache.was_recently_corrected(1).await);
    }

    #[tokio::test]
    async fn sweep_drops_expired_entries() {
        let cache = CorrectionCache::new(Duration::from_millis(1));
        cache.mark_corrected(1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.sweep().await;
        assert!(!cache.was_recently_corrected(1).await);
    }
}
