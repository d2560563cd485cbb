use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-series writer lock, keyed by the id of the series head.
///
/// Writers to the same series queue up; writers to different series proceed
/// independently. Guards release the series when dropped.
#[derive(Debug, Default, Clone)]
pub struct SeriesLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl SeriesLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, series_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody else holds or waits on can go.
            map.retain(|id, lock| *id == series_id || Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(series_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of series currently tracked.
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .map(|map| map.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}
