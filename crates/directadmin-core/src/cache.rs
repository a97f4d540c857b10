// Per-object response cache
//
// Every model object owns one `ObjectCache`: a slot-keyed memo of
// previously computed values (config blobs, child collections). Slots
// are a closed enum rather than strings so a typo cannot silently create
// a new namespace. Invalidation is coarse: `clear` drops every slot.
//
// The cache is exclusively owned by its object and never shared between
// two objects referring to the same remote entity; holding both leaves a
// documented staleness window. The mutex guards only map access and is
// never held across an await, so a concurrent double-fetch is possible;
// the library assumes a single logical caller per object graph.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Cache namespaces, one per kind of derived/remote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    /// Account config blob (`SHOW_USER_CONFIG`).
    Config,
    /// Account usage blob (`SHOW_USER_USAGE`).
    Usage,
    /// Domains owned by a user, keyed by domain name.
    Domains,
    /// Union of a domain's name, aliases, and pointers.
    DomainNames,
    /// Databases owned by a user, keyed by short name.
    Databases,
    /// Database quota blob (`DATABASES` action=quota).
    DatabaseQuotas,
    /// Email forwarders of a domain.
    Forwarders,
    /// Mailboxes of a domain.
    Mailboxes,
    /// Subdomains of a domain.
    Subdomains,
    /// Access hosts of a database.
    AccessHosts,
    /// Panel-side users of a database.
    DatabaseUsers,
}

type SlotValue = Arc<dyn Any + Send + Sync>;

/// Slot-keyed memoization cache owned by a single model object.
#[derive(Default)]
pub struct ObjectCache {
    slots: Mutex<HashMap<CacheSlot, SlotValue>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheSlot, SlotValue>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored value for `slot`, if present and of the expected type.
    pub fn get<T: Send + Sync + 'static>(&self, slot: CacheSlot) -> Option<Arc<T>> {
        let value = self.lock().get(&slot)?.clone();
        value.downcast::<T>().ok()
    }

    /// Store a value, replacing any previous occupant of the slot.
    pub fn insert<T: Send + Sync + 'static>(&self, slot: CacheSlot, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.lock().insert(slot, value.clone());
        value
    }

    /// Return the cached value, computing and storing it on first access.
    ///
    /// `fetch` runs at most once per slot until the next [`clear`]; a
    /// failed fetch stores nothing, so the next access retries.
    ///
    /// [`clear`]: Self::clear
    pub async fn get_or_fetch<T, F, Fut, E>(&self, slot: CacheSlot, fetch: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(slot) {
            return Ok(value);
        }
        let value = fetch().await?;
        Ok(self.insert(slot, value))
    }

    /// Sparse lookup into a cached string-pair blob.
    ///
    /// If the slot is empty, `fetch` populates the whole blob once; only
    /// `key` is then read out. Repeated lookups of different keys share
    /// the single fetch.
    pub async fn get_value<F, Fut, E>(
        &self,
        slot: CacheSlot,
        key: &str,
        fetch: F,
    ) -> Result<Option<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BTreeMap<String, String>, E>>,
    {
        let blob = self.get_or_fetch(slot, fetch).await?;
        Ok(blob.get(key).cloned())
    }

    /// Drop every slot at once. There is deliberately no per-slot removal.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn contains(&self, slot: CacheSlot) -> bool {
        self.lock().contains_key(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.lock();
        f.debug_struct("ObjectCache")
            .field("slots", &slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn fetch_runs_at_most_once_per_slot() {
        let cache = ObjectCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Arc<String> = cache
                .get_or_fetch(CacheSlot::Config, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>("computed".to_owned())
                })
                .await
                .unwrap();
            assert_eq!(*value, "computed");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_forces_a_refetch() {
        let cache = ObjectCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(42u64)
        };

        cache.get_or_fetch(CacheSlot::Usage, fetch).await.unwrap();
        cache.clear();
        assert!(!cache.contains(CacheSlot::Usage));
        cache.get_or_fetch(CacheSlot::Usage, fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_stores_nothing() {
        let cache = ObjectCache::new();

        let result: Result<Arc<u64>, &str> = cache
            .get_or_fetch(CacheSlot::Domains, || async { Err("boom") })
            .await;
        assert!(result.is_err());
        assert!(!cache.contains(CacheSlot::Domains));
    }

    #[tokio::test]
    async fn sparse_blob_lookup_shares_one_fetch() {
        let cache = ObjectCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(BTreeMap::from([
                ("mysql".to_owned(), "unlimited".to_owned()),
                ("vdomains".to_owned(), "5".to_owned()),
            ]))
        };

        let mysql = cache.get_value(CacheSlot::Config, "mysql", fetch).await.unwrap();
        let vdomains = cache.get_value(CacheSlot::Config, "vdomains", fetch).await.unwrap();
        let missing = cache.get_value(CacheSlot::Config, "nope", fetch).await.unwrap();

        assert_eq!(mysql.as_deref(), Some("unlimited"));
        assert_eq!(vdomains.as_deref(), Some("5"));
        assert_eq!(missing, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slots_are_typed() {
        let cache = ObjectCache::new();
        cache.insert(CacheSlot::Config, 7u32);
        assert!(cache.get::<String>(CacheSlot::Config).is_none());
        assert_eq!(cache.get::<u32>(CacheSlot::Config).as_deref(), Some(&7));
    }
}
