//! In-memory TTL cache with timer-driven eviction.
//!
//! Entries are evicted by a scheduled task rather than checked on read, so a
//! key present in the cache is always fresh. Re-setting a key cancels its
//! pending timer and schedules a new one from the new TTL.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::{LoaderError, Result};

/// How long a cached value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Live until explicitly cleared.
    Never,
    /// Evict after the given duration.
    After(Duration),
}

impl Ttl {
    /// Milliseconds, where any negative value means [`Ttl::Never`].
    pub fn from_millis(ms: i64) -> Self {
        if ms < 0 {
            Ttl::Never
        } else {
            Ttl::After(Duration::from_millis(ms as u64))
        }
    }

    /// Parse a numeric string of milliseconds.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if let Ok(ms) = trimmed.parse::<i64>() {
            return Ok(Self::from_millis(ms));
        }
        match trimmed.parse::<f64>() {
            Ok(ms) if ms.is_finite() => Ok(Self::from_millis(ms as i64)),
            _ => Err(LoaderError::InvalidTtl(raw.to_string())),
        }
    }

    /// Milliseconds, with `-1` for [`Ttl::Never`].
    pub fn as_millis(&self) -> i64 {
        match self {
            Ttl::Never => -1,
            Ttl::After(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Never => write!(f, "never"),
            Ttl::After(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

type EvictionHook = Arc<dyn Fn(&str) + Send + Sync>;

struct Slot<V> {
    value: V,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct CacheState<V> {
    entries: HashMap<String, Slot<V>>,
    next_generation: u64,
}

/// Key → value store whose entries expire on a timer.
pub struct TtlCache<V> {
    state: Arc<Mutex<CacheState<V>>>,
    on_evict: Option<EvictionHook>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                next_generation: 0,
            })),
            on_evict: None,
        }
    }

    /// Run `hook` with the key whenever a timer evicts an entry.
    ///
    /// Explicit `remove` and `clear` calls do not trigger the hook.
    pub fn with_eviction_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Arc::new(hook));
        self
    }

    /// Store `value` under `key`, replacing any previous entry and its timer.
    pub fn set(&self, key: &str, value: V, ttl: Ttl) {
        let mut state = self.lock();
        let generation = state.next_generation;
        state.next_generation += 1;

        if let Some(previous) = state.entries.remove(key) {
            if let Some(timer) = previous.timer {
                timer.abort();
            }
        }

        let timer = match ttl {
            Ttl::Never => None,
            Ttl::After(delay) => self.schedule_eviction(key, generation, delay),
        };

        tracing::debug!(key, %ttl, "cache set");
        state.entries.insert(
            key.to_string(),
            Slot {
                value,
                generation,
                timer,
            },
        );
    }

    /// Stored value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().entries.get(key).map(|slot| slot.value.clone())
    }

    /// Whether `key` is currently cached.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Remove `key` and cancel its timer. Returns the removed value.
    pub fn remove(&self, key: &str) -> Option<V> {
        let slot = self.lock().entries.remove(key)?;
        if let Some(timer) = slot.timer {
            timer.abort();
        }
        Some(slot.value)
    }

    /// Evict everything and cancel all pending timers.
    pub fn clear(&self) {
        let mut state = self.lock();
        for (_, slot) in state.entries.drain() {
            if let Some(timer) = slot.timer {
                timer.abort();
            }
        }
        tracing::debug!("cache cleared");
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn schedule_eviction(&self, key: &str, generation: u64, delay: Duration) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(key, "no async runtime available; cached entry will not expire");
                return None;
            }
        };

        let state: Weak<Mutex<CacheState<V>>> = Arc::downgrade(&self.state);
        let hook = self.on_evict.clone();
        let key = key.to_string();

        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(state) = state.upgrade() else {
                return;
            };
            let evicted = {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                match state.entries.get(&key) {
                    Some(slot) if slot.generation == generation => {
                        state.entries.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if evicted {
                tracing::debug!(key = %key, "cache entry expired");
                if let Some(hook) = hook {
                    hook(&key);
                }
            }
        }))
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for (_, slot) in state.entries.drain() {
            if let Some(timer) = slot.timer {
                timer.abort();
            }
        }
    }
}
