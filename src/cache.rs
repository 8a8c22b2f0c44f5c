use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    hash::Hash,
};

struct Entry<V> {
    value: V,
    /// position in the recency order, larger is more recent
    tick: u64,
}

/// Bounded least-recently-used cache.
///
/// Every `get`, `get_mut` and `insert` promotes the entry to the most recently
/// used position. When an insert of a new key would exceed the capacity, the
/// least recently used entry is removed and handed back to the caller, which
/// is responsible for persisting it if needed.
pub struct Cache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    capacity: usize,
    /// Map of all entries for quick access.
    entries: HashMap<K, Entry<V>>,
    /// recency order, oldest first
    order: BTreeMap<u64, K>,
    clock: u64,
    stats: Stats,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Cache {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            clock: 0,
            stats: Stats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a reference to the value of the given key if it exists in the cache.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_mut(key).map(|value| &*value)
    }

    /// Returns a mutable reference to the value of the given key and promotes it.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.order.remove(&entry.tick);
                entry.tick = tick;
                self.order.insert(tick, key.clone());
                self.stats.hits += 1;
                Some(&mut entry.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Mutable access without touching the recency order or the stats.
    pub fn peek_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Counts a lookup that the caller resolved without `get`, e.g. a load
    /// from the backing store.
    pub fn record_miss(&mut self) {
        self.stats.misses += 1;
    }

    /// The entry `insert` would evict next, without removing it.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let (_, key) = self.order.first_key_value()?;
        self.entries.get(key).map(|entry| (key, &entry.value))
    }

    /// Inserts or replaces an entry. Returns the evicted entry, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            entry.value = value;
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        self.order.insert(tick, key.clone());
        self.entries.insert(key, Entry { value, tick });
        evicted
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let entry = self.entries.remove(&key)?;
        Some((key, entry.value))
    }

    /// Iterates entries from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .values()
            .filter_map(move |key| self.entries.get(key).map(|entry| (key, &entry.value)))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits,
            misses: self.stats.misses,
            len: self.entries.len(),
            capacity: self.capacity,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

#[derive(Default)]
struct Stats {
    hits: usize,
    misses: usize,
}

/// Snapshot of cache occupancy and hit ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub len: usize,
    pub capacity: usize,
}
