//! HistoryStore - owner of the canonical entry collection
//!
//! Concurrency model:
//! - The collection lives in an `Arc<Vec<Entry>>` behind a `parking_lot::RwLock`.
//!   Writers clone-on-write via `Arc::make_mut`, so a snapshot handed out earlier
//!   is never mutated and readers never see a half-applied merge.
//! - Snapshot identity changes iff the collection changed, which is what the
//!   view cache keys on.
//! - Subscribers are called synchronously, once per change, after the write
//!   lock is released. A callback may read the store or (un)subscribe.
//!
//! "Not found" is never an error here: the collaborator may delete entries
//! concurrently, so missing ids are treated as no-ops.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::interface::{AppUsage, CaptureOutcome, Statistics};
use crate::models::Entry;

/// Change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted { id: String },
    Promoted { id: String, copy_count: u32 },
    /// Favorite flag or metadata changed in place
    Updated { id: String },
    Removed { id: String },
    Cleared,
    Replaced { len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct State {
    entries: Arc<Vec<Entry>>,
    revision: u64,
}

#[derive(Default)]
pub struct HistoryStore {
    state: RwLock<State>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("HistoryStore")
            .field("len", &state.entries.len())
            .field("revision", &state.revision)
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an initial collection (same rules as `replace_all`)
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        let store = Self::new();
        store.state.write().entries = Arc::new(dedup(entries));
        store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns false when the id was not (or no longer) subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    fn notify(&self, event: StoreEvent) {
        // Clone the list so callbacks run without holding any lock.
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Run `f` under the write lock. `f` returns `Some` only when it changed
    /// the collection, and must call `Arc::make_mut` only once it knows it
    /// will, so a no-op never replaces the snapshot.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Arc<Vec<Entry>>) -> Option<(T, StoreEvent)>,
    ) -> Option<T> {
        let (value, event) = {
            let mut state = self.state.write();
            let changed = f(&mut state.entries)?;
            state.revision += 1;
            changed
        };
        self.notify(event);
        Some(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Merge one capture event.
    ///
    /// Known hash: count it, refresh its timestamp and move it to the front,
    /// keeping its id and favorite flag. Known id with new content: replace it
    /// and move it to the front. Otherwise insert at the front.
    pub fn apply_capture(&self, incoming: Entry) -> CaptureOutcome {
        let outcome = {
            let mut state = self.state.write();
            let entries = Arc::make_mut(&mut state.entries);
            let outcome = merge_capture(entries, incoming);
            state.revision += 1;
            outcome
        };

        tracing::debug!(outcome = ?outcome, "Applied capture");
        self.notify(match &outcome {
            CaptureOutcome::Inserted { id } => StoreEvent::Inserted { id: id.clone() },
            CaptureOutcome::Promoted { id, copy_count } => StoreEvent::Promoted {
                id: id.clone(),
                copy_count: *copy_count,
            },
        });
        outcome
    }

    /// Replace the collection wholesale, keeping the given order. Later
    /// duplicates (by hash or id) are dropped.
    pub fn replace_all(&self, entries: Vec<Entry>) -> usize {
        let entries = dedup(entries);
        let len = entries.len();
        {
            let mut state = self.state.write();
            state.entries = Arc::new(entries);
            state.revision += 1;
        }
        self.notify(StoreEvent::Replaced { len });
        len
    }

    /// Flip the favorite flag. Returns the new value, or `None` if absent.
    pub fn toggle_favorite(&self, id: &str) -> Option<bool> {
        self.mutate(|entries| {
            let pos = entries.iter().position(|e| e.id == id)?;
            let entry = &mut Arc::make_mut(entries)[pos];
            entry.is_favorite = !entry.is_favorite;
            Some((entry.is_favorite, StoreEvent::Updated { id: id.to_string() }))
        })
    }

    /// Set the favorite flag. Returns whether the entry exists.
    pub fn set_favorite(&self, id: &str, value: bool) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.mutate(|entries| {
            let pos = entries
                .iter()
                .position(|e| e.id == id && e.is_favorite != value)?;
            Arc::make_mut(entries)[pos].is_favorite = value;
            Some(((), StoreEvent::Updated { id: id.to_string() }))
        });
        true
    }

    /// Attach metadata that arrived after the capture. Returns whether the
    /// entry exists.
    pub fn update_metadata(&self, id: &str, metadata: Option<String>) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.mutate(|entries| {
            let pos = entries
                .iter()
                .position(|e| e.id == id && e.metadata != metadata)?;
            Arc::make_mut(entries)[pos].metadata = metadata;
            Some(((), StoreEvent::Updated { id: id.to_string() }))
        });
        true
    }

    pub fn remove(&self, id: &str) -> Option<Entry> {
        self.mutate(|entries| {
            let pos = entries.iter().position(|e| e.id == id)?;
            let removed = Arc::make_mut(entries).remove(pos);
            Some((removed, StoreEvent::Removed { id: id.to_string() }))
        })
    }

    /// Empty the collection. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        self.mutate(|entries| {
            if entries.is_empty() {
                return None;
            }
            let len = entries.len();
            *entries = Arc::new(Vec::new());
            Some((len, StoreEvent::Cleared))
        })
        .unwrap_or(0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Immutable view of the collection, newest first
    pub fn snapshot(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&self.state.read().entries)
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.state.read().entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Incremented on every state change
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Totals, the most copied entries and the busiest source apps.
    /// Ties keep collection order (most recent first).
    pub fn statistics(&self, most_copied_limit: usize, recent_apps_limit: usize) -> Statistics {
        let entries = self.snapshot();

        let total_copies = entries.iter().map(|e| u64::from(e.copy_count)).sum();

        let mut most_copied: Vec<Entry> = entries.iter().cloned().collect();
        most_copied.sort_by(|a, b| b.copy_count.cmp(&a.copy_count));
        most_copied.truncate(most_copied_limit);

        let mut counts: HashMap<&str, u64> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for app in entries.iter().filter_map(|e| e.source_app.as_deref()) {
            let count = counts.entry(app).or_insert_with(|| {
                order.push(app);
                0
            });
            *count += 1;
        }
        let mut recent_apps: Vec<AppUsage> = order
            .into_iter()
            .map(|app| AppUsage { app_name: app.to_string(), count: counts[app] })
            .collect();
        recent_apps.sort_by(|a, b| b.count.cmp(&a.count));
        recent_apps.truncate(recent_apps_limit);

        Statistics {
            total_entries: entries.len() as u64,
            total_copies,
            most_copied,
            recent_apps,
        }
    }
}

fn merge_capture(entries: &mut Vec<Entry>, incoming: Entry) -> CaptureOutcome {
    if let Some(pos) = entries
        .iter()
        .position(|e| e.content_hash == incoming.content_hash)
    {
        let existing = &mut entries[pos];
        existing.copy_count = existing.copy_count.saturating_add(1);
        existing.created_at = incoming.created_at;
        if incoming.metadata.is_some() {
            existing.metadata = incoming.metadata;
        }
        if incoming.content_subtype.is_some() {
            existing.content_subtype = incoming.content_subtype;
        }
        if incoming.source_app.is_some() {
            existing.source_app = incoming.source_app;
        }
        if incoming.app_bundle_id.is_some() {
            existing.app_bundle_id = incoming.app_bundle_id;
        }
        let outcome = CaptureOutcome::Promoted {
            id: existing.id.clone(),
            copy_count: existing.copy_count,
        };
        entries[..=pos].rotate_right(1);
        return outcome;
    }

    let id = incoming.id.clone();
    let mut incoming = incoming;
    incoming.copy_count = incoming.copy_count.max(1);
    if let Some(pos) = entries.iter().position(|e| e.id == incoming.id) {
        // Collaborator re-emitted a known record with new content.
        entries[pos] = incoming;
        entries[..=pos].rotate_right(1);
    } else {
        entries.insert(0, incoming);
    }
    CaptureOutcome::Inserted { id }
}

fn dedup(entries: Vec<Entry>) -> Vec<Entry> {
    let mut hashes = HashSet::new();
    let mut ids = HashSet::new();
    let before = entries.len();
    let kept: Vec<Entry> = entries
        .into_iter()
        .filter(|e| {
            let fresh_hash = !hashes.contains(&e.content_hash);
            let fresh_id = !ids.contains(&e.id);
            if fresh_hash && fresh_id {
                hashes.insert(e.content_hash.clone());
                ids.insert(e.id.clone());
            }
            fresh_hash && fresh_id
        })
        .map(|mut e| {
            e.copy_count = e.copy_count.max(1);
            e
        })
        .collect();
    if kept.len() != before {
        tracing::debug!(dropped = before - kept.len(), "Dropped duplicate entries from bulk load");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn capture(hash: &str, data: &str) -> Entry {
        let mut entry = Entry::new_text(data, None);
        entry.content_hash = hash.to_string();
        entry
    }

    fn recorder(store: &HistoryStore) -> (SubscriptionId, Arc<Mutex<Vec<StoreEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let id = store.subscribe(move |event| sink.lock().push(event.clone()));
        (id, events)
    }

    #[test]
    fn test_duplicate_capture_promotes_and_counts() {
        let store = HistoryStore::new();
        let first = store.apply_capture(capture("a", "x"));
        let second = store.apply_capture(capture("a", "x"));

        assert!(matches!(first, CaptureOutcome::Inserted { .. }));
        assert_eq!(second, CaptureOutcome::Promoted { id: first.id().to_string(), copy_count: 2 });
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].copy_count, 2);
        assert_eq!(snapshot[0].id, first.id());
    }

    #[test]
    fn test_promotion_is_stable_move() {
        let store = HistoryStore::new();
        for hash in ["a", "b", "c", "d"] {
            store.apply_capture(capture(hash, hash));
        }
        // Order is now d, c, b, a
        store.apply_capture(capture("b", "b").with_created_at(99));

        let hashes: Vec<_> = store.snapshot().iter().map(|e| e.content_hash.clone()).collect();
        assert_eq!(hashes, vec!["b", "d", "c", "a"]);
        assert_eq!(store.snapshot()[0].created_at, 99);
    }

    #[test]
    fn test_promotion_keeps_favorite_and_takes_fresh_metadata() {
        let store = HistoryStore::new();
        let id = store.apply_capture(capture("a", "x")).id().to_string();
        store.apply_capture(capture("b", "y"));
        store.toggle_favorite(&id);

        store.apply_capture(capture("a", "x").with_metadata(r#"{"detected_language":"rust"}"#));
        let entry = store.get(&id).unwrap();
        assert!(entry.is_favorite);
        assert_eq!(entry.metadata.as_deref(), Some(r#"{"detected_language":"rust"}"#));

        // Absent metadata on a later capture doesn't wipe it.
        store.apply_capture(capture("a", "x"));
        assert!(store.get(&id).unwrap().metadata.is_some());
    }

    #[test]
    fn test_same_id_new_hash_is_replaced() {
        let store = HistoryStore::new();
        let original = capture("a", "old");
        store.apply_capture(original.clone());
        store.apply_capture(capture("b", "other"));

        let mut edited = original.clone();
        edited.content_hash = "a2".to_string();
        edited.content_data = Some("new".to_string());
        store.apply_capture(edited);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, original.id);
        assert_eq!(snapshot[0].content_data.as_deref(), Some("new"));
    }

    #[test]
    fn test_dedup_invariant_random_sequences() {
        let mut rng = rand::thread_rng();
        let hashes = ["h0", "h1", "h2", "h3", "h4", "h5"];
        for _ in 0..50 {
            let store = HistoryStore::new();
            let mut expected: HashMap<&str, u32> = HashMap::new();
            for _ in 0..rng.gen_range(1..60) {
                let hash = *hashes.choose(&mut rng).unwrap();
                store.apply_capture(capture(hash, hash));
                *expected.entry(hash).or_default() += 1;
                assert_eq!(store.snapshot()[0].content_hash, hash);
            }
            let snapshot = store.snapshot();
            assert_eq!(snapshot.len(), expected.len());
            for entry in snapshot.iter() {
                assert_eq!(entry.copy_count, expected[entry.content_hash.as_str()]);
            }
        }
    }

    #[test]
    fn test_replace_all_keeps_order_and_dedups() {
        let store = HistoryStore::new();
        let a = capture("a", "1");
        let b = capture("b", "2");
        let a_again = capture("a", "3");
        let mut b_same_id = capture("c", "4");
        b_same_id.id = b.id.clone();

        let len = store.replace_all(vec![a.clone(), b.clone(), a_again, b_same_id]);
        assert_eq!(len, 2);
        let ids: Vec<_> = store.snapshot().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_zero_copy_count_is_normalized() {
        let mut loaded = capture("a", "1");
        loaded.copy_count = 0;
        let store = HistoryStore::new();
        store.replace_all(vec![loaded.clone()]);
        assert_eq!(store.snapshot()[0].copy_count, 1);

        let store = HistoryStore::with_entries(vec![loaded.clone()]);
        assert_eq!(store.snapshot()[0].copy_count, 1);

        let mut reemitted = loaded.clone();
        reemitted.content_hash = "a2".to_string();
        reemitted.copy_count = 0;
        store.apply_capture(reemitted);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content_hash, "a2");
        assert_eq!(snapshot[0].copy_count, 1);
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let store = HistoryStore::new();
        store.apply_capture(capture("a", "x"));
        let (_, events) = recorder(&store);
        let revision = store.revision();

        assert_eq!(store.toggle_favorite("missing"), None);
        assert!(!store.set_favorite("missing", true));
        assert!(!store.update_metadata("missing", None));
        assert_eq!(store.remove("missing"), None);

        assert_eq!(store.revision(), revision);
        assert!(events.lock().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_subscribers_notified_synchronously() {
        let store = HistoryStore::new();
        let (sub, events) = recorder(&store);

        let id = store.apply_capture(capture("a", "x")).id().to_string();
        store.apply_capture(capture("a", "x"));
        store.toggle_favorite(&id);
        store.remove(&id);
        store.clear();
        store.apply_capture(capture("b", "y"));
        store.clear();

        {
            let events = events.lock();
            assert_eq!(events.len(), 6);
            assert_eq!(events[0], StoreEvent::Inserted { id: id.clone() });
            assert_eq!(events[1], StoreEvent::Promoted { id: id.clone(), copy_count: 2 });
            assert_eq!(events[2], StoreEvent::Updated { id: id.clone() });
            assert_eq!(events[3], StoreEvent::Removed { id });
            assert_eq!(events[5], StoreEvent::Cleared);
        }

        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.apply_capture(capture("c", "z"));
        assert_eq!(events.lock().len(), 6);
    }

    #[test]
    fn test_callback_can_read_store() {
        let store = Arc::new(HistoryStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (reader, sink) = (Arc::downgrade(&store), Arc::clone(&seen));
        store.subscribe(move |_| {
            if let Some(store) = reader.upgrade() {
                sink.lock().push(store.len());
            }
        });

        store.apply_capture(capture("a", "x"));
        store.apply_capture(capture("b", "y"));
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_snapshot_is_copy_on_write() {
        let store = HistoryStore::new();
        store.apply_capture(capture("a", "x"));
        let before = store.snapshot();

        store.apply_capture(capture("b", "y"));
        assert_eq!(before.len(), 1);
        assert!(!Arc::ptr_eq(&before, &store.snapshot()));

        // A no-op keeps identity.
        let current = store.snapshot();
        store.remove("missing");
        assert!(Arc::ptr_eq(&current, &store.snapshot()));
    }

    #[test]
    fn test_statistics() {
        let store = HistoryStore::new();
        for _ in 0..10 {
            store.apply_capture(Entry::new_text("popular", Some("Safari".to_string())));
        }
        store.apply_capture(Entry::new_text("one", Some("Terminal".to_string())));
        store.apply_capture(Entry::new_text("two", Some("Safari".to_string())));
        store.apply_capture(Entry::new_text("three", None));

        let stats = store.statistics(10, 10);
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.total_copies, 13);
        assert_eq!(stats.most_copied[0].copy_count, 10);
        assert_eq!(stats.recent_apps[0], AppUsage { app_name: "Safari".to_string(), count: 2 });
        assert_eq!(stats.recent_apps.len(), 2);

        let limited = store.statistics(1, 1);
        assert_eq!(limited.most_copied.len(), 1);
        assert_eq!(limited.recent_apps.len(), 1);
    }
}
