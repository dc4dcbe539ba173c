//! Bounded least-recently-used map with an optional time-to-live.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Slot<V> {
    value: V,
    inserted: Instant,
    tick: u64,
}

#[derive(Debug)]
pub(crate) struct LruMap<K, V> {
    capacity: usize,
    ttl: Option<Duration>,
    entries: HashMap<K, Slot<V>>,
    /// Recency order: tick -> key. The smallest tick is the eviction victim.
    order: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K: Eq + Hash + Clone, V> LruMap<K, V> {
    pub(crate) fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn is_expired(&self, slot: &Slot<V>) -> bool {
        self.ttl.is_some_and(|ttl| slot.inserted.elapsed() >= ttl)
    }

    /// Look up `key`, refreshing its recency. Expired entries are dropped
    /// and reported through `evicted`.
    pub(crate) fn get(&mut self, key: &K, evicted: &mut usize) -> Option<&V> {
        let expired = self.entries.get(key).map(|slot| self.is_expired(slot))?;
        if expired {
            self.remove(key);
            *evicted += 1;
            return None;
        }
        let tick = self.bump();
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.tick);
        slot.tick = tick;
        self.order.insert(tick, key.clone());
        Some(&slot.value)
    }

    /// Insert or replace `key`. Returns how many entries were evicted to
    /// stay within capacity.
    pub(crate) fn insert(&mut self, key: K, value: V) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        let tick = self.bump();
        let slot = Slot {
            value,
            inserted: Instant::now(),
            tick,
        };
        if let Some(old) = self.entries.insert(key.clone(), slot) {
            self.order.remove(&old.tick);
        }
        self.order.insert(tick, key);

        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            let Some((_, victim)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&victim);
            evicted += 1;
        }
        evicted
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        Some(slot.value)
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, slot)| !keep(*k, &slot.value))
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            self.remove(&key);
        }
    }

    /// Unexpired entries, without touching recency.
    pub(crate) fn iter_live(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries
            .iter()
            .filter(|(_, slot)| !self.is_expired(slot))
            .map(|(k, slot)| (k, &slot.value))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
