//! Read-through cache seam for widget reads.
//!
//! The engine only ever *reads through* and *invalidates*; it never relies on
//! the cache for correctness. Invalidation is fire-and-forget.
//!
//! Every key carries an invalidation generation. A reader samples it before
//! going to the store and hands it back on `put_*`; the put is dropped when
//! the key was invalidated in between, so a slow read cannot resurrect a
//! value that a concurrent write already replaced.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use super::model::Widget;
use crate::types::{DbId, WidgetId};

/// Default time-to-live for cached entries (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key for a single widget.
pub fn widget_key(id: WidgetId) -> String {
    format!("widget:{id}")
}

/// Cache key for a user's ordered widget list.
pub fn owner_list_key(user_id: DbId) -> String {
    format!("widgets-by-owner:{user_id}")
}

/// Cache collaborator used by the engine.
pub trait WidgetCache: Send + Sync {
    fn get_widget(&self, id: WidgetId) -> Option<Widget>;
    /// Current invalidation generation of `key`.
    fn generation(&self, key: &str) -> u64;
    /// Cache `widget` unless its key was invalidated after `generation`.
    fn put_widget(&self, widget: &Widget, generation: u64);
    fn get_owner_widgets(&self, user_id: DbId) -> Option<Vec<Widget>>;
    fn put_owner_widgets(&self, user_id: DbId, widgets: &[Widget], generation: u64);
    /// Drop the entry under `key`, if any, and advance its generation.
    fn invalidate(&self, key: &str);
}

#[derive(Clone)]
enum Cached {
    Widget(Widget),
    List(Vec<Widget>),
}

struct Entry {
    value: Cached,
    expires_at: Instant,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    generations: HashMap<String, u64>,
}

/// In-process TTL cache.
///
/// Expired entries are ignored on read; [`MemoryWidgetCache::purge_expired`]
/// reclaims them and is meant to be called periodically by the host.
pub struct MemoryWidgetCache {
    state: RwLock<State>,
    ttl: Duration,
}

impl MemoryWidgetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(State::default()),
            ttl,
        }
    }

    /// Remove every expired entry, returning how many were dropped.
    ///
    /// Generations are kept: dropping them could let an in-flight read
    /// observe a reset counter.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|_, e| e.expires_at > now);
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Poisoning is ignored: every write leaves both maps consistent.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    fn get(&self, key: &str) -> Option<Cached> {
        self.read()
            .entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    fn put(&self, key: String, value: Cached, generation: u64) {
        let mut state = self.write();
        let current = state.generations.get(&key).copied().unwrap_or(0);
        if current != generation {
            tracing::debug!(key = %key, "Dropped stale cache fill");
            return;
        }
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        state.entries.insert(key, entry);
    }
}

impl Default for MemoryWidgetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl WidgetCache for MemoryWidgetCache {
    fn get_widget(&self, id: WidgetId) -> Option<Widget> {
        match self.get(&widget_key(id))? {
            Cached::Widget(w) => Some(w),
            Cached::List(_) => None,
        }
    }

    fn generation(&self, key: &str) -> u64 {
        self.read().generations.get(key).copied().unwrap_or(0)
    }

    fn put_widget(&self, widget: &Widget, generation: u64) {
        self.put(
            widget_key(widget.id),
            Cached::Widget(widget.clone()),
            generation,
        );
    }

    fn get_owner_widgets(&self, user_id: DbId) -> Option<Vec<Widget>> {
        match self.get(&owner_list_key(user_id))? {
            Cached::List(list) => Some(list),
            Cached::Widget(_) => None,
        }
    }

    fn put_owner_widgets(&self, user_id: DbId, widgets: &[Widget], generation: u64) {
        self.put(
            owner_list_key(user_id),
            Cached::List(widgets.to_vec()),
            generation,
        );
    }

    fn invalidate(&self, key: &str) {
        let mut state = self.write();
        state.entries.remove(key);
        *state.generations.entry(key.to_owned()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Widget {
        let now = chrono::Utc::now();
        Widget {
            id: uuid::Uuid::new_v4(),
            user_id: 1,
            widget_type: "about".into(),
            component: "AboutWidget".into(),
            x: 0,
            y: 0,
            w: 12,
            h: 2,
            settings: None,
            display_name: None,
            is_visible: true,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn keys_follow_naming_convention() {
        let id = uuid::Uuid::nil();
        assert_eq!(widget_key(id), format!("widget:{id}"));
        assert_eq!(owner_list_key(9), "widgets-by-owner:9");
    }

    #[test]
    fn put_get_and_invalidate() {
        let cache = MemoryWidgetCache::default();
        let w = widget();
        cache.put_widget(&w, 0);
        cache.put_owner_widgets(1, std::slice::from_ref(&w), 0);

        assert_eq!(cache.get_widget(w.id), Some(w.clone()));
        assert_eq!(cache.get_owner_widgets(1).map(|l| l.len()), Some(1));

        cache.invalidate(&widget_key(w.id));
        cache.invalidate(&owner_list_key(1));
        assert!(cache.get_widget(w.id).is_none());
        assert!(cache.get_owner_widgets(1).is_none());
    }

    #[test]
    fn expired_entries_are_ignored_and_purged() {
        let cache = MemoryWidgetCache::new(Duration::ZERO);
        let w = widget();
        cache.put_widget(&w, 0);
        assert!(cache.get_widget(w.id).is_none());
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn fill_after_invalidation_is_dropped() {
        let cache = MemoryWidgetCache::default();
        let w = widget();
        let key = widget_key(w.id);

        let sampled = cache.generation(&key);
        cache.invalidate(&key);
        cache.put_widget(&w, sampled);
        assert!(cache.get_widget(w.id).is_none());

        let fresh = cache.generation(&key);
        assert_eq!(fresh, sampled + 1);
        cache.put_widget(&w, fresh);
        assert_eq!(cache.get_widget(w.id), Some(w));
    }
}
