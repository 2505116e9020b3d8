//! In-memory history store with LRU capacity and idle expiry.
//!
//! Histories live for the lifetime of the process unless the retention policy
//! drops them: once more than `capacity` conversations are held, the least
//! recently used one is evicted, and with an idle TTL configured a
//! conversation untouched for longer than the TTL reads as absent.

use crate::config::MemoryConfig;
use crate::core_types::{ConversationId, History};
use crate::memory::{HistoryStore, StoreStats};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Entry {
    history: History,
    touched: Instant,
}

pub struct InMemoryHistoryStore {
    entries: Mutex<LruCache<ConversationId, Entry>>,
    idle_ttl: Option<Duration>,
}

impl InMemoryHistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            idle_ttl: None,
        }
    }

    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = Some(ttl);
        self
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        let store = Self::new(config.max_conversations);
        match config.idle_ttl_secs {
            Some(secs) => store.with_idle_ttl(Duration::from_secs(secs)),
            None => store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ConversationId, Entry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.idle_ttl
            .map(|ttl| entry.touched.elapsed() > ttl)
            .unwrap_or(false)
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn get_history(&self, id: &ConversationId) -> Option<History> {
        let mut entries = self.lock();

        let expired = self.is_expired(entries.peek(id)?);
        if expired {
            entries.pop(id);
            log::debug!("Conversation {} expired after idle timeout", id);
            return None;
        }

        entries.get_mut(id).map(|entry| {
            entry.touched = Instant::now();
            entry.history.clone()
        })
    }

    fn set_history(&self, id: &ConversationId, history: History) {
        let entry = Entry {
            history,
            touched: Instant::now(),
        };

        if let Some((evicted, _)) = self.lock().push(*id, entry) {
            if evicted != *id {
                log::info!("Evicted least recently used conversation {}", evicted);
            }
        }
    }

    fn stats(&self) -> StoreStats {
        let entries = self.lock();
        StoreStats {
            conversations: entries.len(),
            turns: entries.iter().map(|(_, e)| e.history.len()).sum(),
        }
    }
}
