use dashmap::DashMap;
use std::{hash::Hash, sync::Arc};
use tokio::sync::OnceCell;

/// Write-once memo table shared by concurrent callers.
///
/// The first caller for a key runs the initializer; callers arriving while it
/// is in flight await the same cell instead of starting their own. Results
/// never change once stored.
#[derive(Debug)]
pub(crate) struct MemoCache<K: Eq + Hash, V> {
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self { cells: DashMap::new() }
    }

    pub(crate) async fn get_or_init<F, Fut>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        // Clone the cell out so no shard lock is held across the await.
        let cell = self.cells.entry(key).or_default().value().clone();
        cell.get_or_init(init).await.clone()
    }

    /// Completed value for `key`, if any.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

impl<K: Eq + Hash, V: Clone> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
