//! Load-once cache of model handles keyed by model identifier.
//!
//! Each key owns its own slot lock: concurrent callers asking for the same
//! uncached model wait for a single load, while loads of different models
//! proceed independently. Entries are never evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::{debug, info};

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

pub struct ModelCache<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> Default for ModelCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle for `key`, calling `load` only if it is not cached yet.
    ///
    /// A failed load leaves the key empty, so the next call tries again.
    pub fn get_or_load<E, F>(&self, key: &str, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = entry.as_ref() {
            debug!(key, "model cache hit");
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(load()?);
        info!(key, "model cached");
        *entry = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// The cached handle for `key`, if it has been loaded.
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let slot = self.slots().get(key).cloned()?;
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of loaded handles. A model still loading counts as not loaded;
    /// this never waits on a load in progress.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<T>> = self.slots().values().cloned().collect();
        slots
            .iter()
            .filter(|slot| match slot.try_lock() {
                Ok(entry) => entry.is_some(),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
                Err(TryLockError::WouldBlock) => false,
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Slot<T> {
        Arc::clone(self.slots().entry(key.to_string()).or_default())
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn loads_once_per_key() {
        let cache: ModelCache<String> = ModelCache::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let handle = cache
                .get_or_load::<(), _>("model-a", || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok("handle-a".to_string())
                })
                .unwrap();
            assert_eq!(*handle, "handle-a");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn returns_same_handle() {
        let cache: ModelCache<u32> = ModelCache::new();
        let first = cache.get_or_load::<(), _>("k", || Ok(7)).unwrap();
        let second = cache.get_or_load::<(), _>("k", || Ok(8)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, 7);
    }

    #[test]
    fn keys_are_independent() {
        let cache: ModelCache<&'static str> = ModelCache::new();
        cache.get_or_load::<(), _>("a", || Ok("A")).unwrap();
        cache.get_or_load::<(), _>("b", || Ok("B")).unwrap();
        assert_eq!(*cache.get("a").unwrap(), "A");
        assert_eq!(*cache.get("b").unwrap(), "B");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_load_is_retried() {
        let cache: ModelCache<u32> = ModelCache::new();
        let err = cache
            .get_or_load("flaky", || Err("download failed"))
            .unwrap_err();
        assert_eq!(err, "download failed");
        assert!(!cache.contains("flaky"));
        assert!(cache.is_empty());

        let handle = cache.get_or_load::<&str, _>("flaky", || Ok(1)).unwrap();
        assert_eq!(*handle, 1);
        assert!(cache.contains("flaky"));
    }

    #[test]
    fn get_missing_key() {
        let cache: ModelCache<u32> = ModelCache::new();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn concurrent_callers_share_one_load() {
        let cache: Arc<ModelCache<usize>> = Arc::new(ModelCache::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                thread::spawn(move || {
                    cache
                        .get_or_load::<(), _>("shared", || {
                            thread::sleep(Duration::from_millis(20));
                            Ok(loads.fetch_add(1, Ordering::SeqCst))
                        })
                        .unwrap()
                })
            })
            .collect();

        for worker in workers {
            assert_eq!(*worker.join().unwrap(), 0);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn len_does_not_wait_for_loading_model() {
        let cache: Arc<ModelCache<u32>> = Arc::new(ModelCache::new());
        cache.get_or_load::<(), _>("ready", || Ok(1)).unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let loader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache
                    .get_or_load::<(), _>("slow", || {
                        started_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok(2)
                    })
                    .unwrap();
            })
        };

        started_rx.recv().unwrap();
        assert_eq!(cache.len(), 1, "loading slot counts as not loaded");

        release_tx.send(()).unwrap();
        loader.join().unwrap();
        assert_eq!(cache.len(), 2);
    }
}
