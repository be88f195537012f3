//! HistoryEngine - the object the presentation layer drives
//!
//! Composes the store, the memoized view, selection, viewport and the
//! collaborator ports. It is driven from one logical thread through
//! `&mut self`; the only suspension points are collaborator calls.
//!
//! Every read of the view re-resolves the selection against it, so a
//! removed or filtered-out selection falls back to the first row on the next
//! read rather than lingering.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::interface::{CaptureOutcome, HistoryError, Statistics, VisibleRange};
use crate::models::Entry;
use crate::renderer::{select_renderer, Renderer};
use crate::selection::SelectionController;
use crate::service::{ClipboardService, FileImageResolver, ImageResolver};
use crate::store::{HistoryStore, StoreEvent, SubscriptionId};
use crate::view::{TypeFilter, ViewCache};
use crate::viewport::{QuickJumpLabel, QuickJumpOverlay, ViewportTracker};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One rendered row of the visible range
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    pub index: usize,
    pub entry: Entry,
    pub renderer: Renderer,
    pub quick_jump_digit: Option<u8>,
    pub selected: bool,
}

pub struct HistoryEngine {
    config: EngineConfig,
    store: Arc<HistoryStore>,
    service: Arc<dyn ClipboardService>,
    images: Option<Arc<dyn ImageResolver>>,
    cache: ViewCache,
    filter: TypeFilter,
    search_term: String,
    selection: SelectionController,
    viewport: ViewportTracker,
    overlay: QuickJumpOverlay,
    /// View the current range was settled against
    settled_view: Option<Arc<Vec<Entry>>>,
    events: broadcast::Sender<StoreEvent>,
    subscription: SubscriptionId,
}

impl HistoryEngine {
    pub fn new(config: EngineConfig, service: Arc<dyn ClipboardService>) -> Self {
        let store = Arc::new(HistoryStore::new());

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let forward = events.clone();
        let subscription = store.subscribe(move |event| {
            // No receivers is fine.
            let _ = forward.send(event.clone());
        });

        let images = config
            .images
            .root
            .clone()
            .map(|root| Arc::new(FileImageResolver::new(root)) as Arc<dyn ImageResolver>);

        Self {
            viewport: ViewportTracker::new(config.viewport.item_height, config.viewport.initial_height),
            overlay: QuickJumpOverlay::new(config.quick_jump.effective_max_digits()),
            config,
            store,
            service,
            images,
            cache: ViewCache::new(),
            filter: TypeFilter::All,
            search_term: String::new(),
            selection: SelectionController::new(),
            settled_view: None,
            events,
            subscription,
        }
    }

    /// Replace the image resolver (the default comes from `images.root`)
    pub fn with_image_resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.images = Some(resolver);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Store change notifications for other observers of this engine
    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────────

    /// Replace local state with the collaborator's history. On failure the
    /// current state is kept.
    #[tracing::instrument(name = "engine.refresh", skip(self))]
    pub async fn refresh(&mut self) -> Result<usize, HistoryError> {
        let history = match self.service.fetch_history().await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch history");
                return Err(e);
            }
        };
        let len = self.store.replace_all(history);
        tracing::info!(entries = len, "Loaded history");
        self.sync();
        Ok(len)
    }

    /// Merge one capture. The captured entry becomes the selection when the
    /// current filter lets it into the view.
    pub fn apply_capture(&mut self, entry: Entry) -> CaptureOutcome {
        let outcome = self.store.apply_capture(entry);
        let view = self.view();
        if let Some(index) = view.iter().position(|e| e.id == outcome.id()) {
            self.selection.select_explicit(outcome.id(), &view);
            self.viewport.scroll_into_view(index);
        }
        self.settle_viewport();
        outcome
    }

    /// Apply captures from the collaborator in arrival order until the stream
    /// ends or `cancel` fires. Returns how many were applied.
    #[tracing::instrument(name = "engine.run_captures", skip_all)]
    pub async fn run_captures(&mut self, cancel: CancellationToken) -> Result<usize, HistoryError> {
        let mut captures = self.service.subscribe_captures();
        let mut applied = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(applied, "Capture pump cancelled");
                    return Ok(applied);
                }
                next = captures.next() => match next {
                    Some(entry) => {
                        self.apply_capture(entry);
                        applied += 1;
                    }
                    None => {
                        tracing::info!(applied, "Capture stream ended");
                        return Ok(applied);
                    }
                },
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // View
    // ─────────────────────────────────────────────────────────────────────────────

    /// Current derived view. Also re-resolves the selection against it and
    /// re-settles the range when the view changed underneath it, including
    /// changes made directly through [`HistoryEngine::store`].
    pub fn view(&mut self) -> Arc<Vec<Entry>> {
        let snapshot = self.store.snapshot();
        let view = self.cache.get(&snapshot, &self.filter, &self.search_term);
        self.selection.reconcile(&view);
        let stale = self
            .settled_view
            .as_ref()
            .map_or(true, |settled| !Arc::ptr_eq(settled, &view));
        if stale {
            self.viewport.settle(view.len());
            self.settled_view = Some(view.clone());
        }
        view
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn type_filter(&self) -> &TypeFilter {
        &self.filter
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.sync();
    }

    pub fn set_type_filter(&mut self, filter: &str) {
        self.filter = TypeFilter::parse(filter);
        self.sync();
    }

    /// Re-derive, re-resolve selection and settle the range after a change
    /// that may have altered the view.
    fn sync(&mut self) {
        self.view();
        self.settle_viewport();
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn selected_id(&mut self) -> Option<String> {
        self.view();
        self.selection.selected_id().map(str::to_string)
    }

    pub fn selected_entry(&mut self) -> Option<Entry> {
        let view = self.view();
        let index = self.selection.selected_index(&view)?;
        view.get(index).cloned()
    }

    pub fn select_next(&mut self) -> Option<String> {
        let view = self.view();
        let outcome = self.selection.select_next(&view)?;
        self.viewport.scroll_into_view(outcome.scroll.index);
        self.settle_viewport();
        Some(outcome.selected_id)
    }

    pub fn select_previous(&mut self) -> Option<String> {
        let view = self.view();
        let outcome = self.selection.select_previous(&view)?;
        self.viewport.scroll_into_view(outcome.scroll.index);
        self.settle_viewport();
        Some(outcome.selected_id)
    }

    /// Pointer selection; false when `id` isn't in the view
    pub fn select_explicit(&mut self, id: &str) -> bool {
        let view = self.view();
        self.selection.select_explicit(id, &view)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Quick jump
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn set_modifier_held(&mut self, held: bool) {
        if held {
            self.overlay.activate();
        } else {
            self.overlay.deactivate();
        }
    }

    /// Digits for the current range; empty unless the modifier is held
    pub fn quick_jump_labels(&mut self) -> Vec<QuickJumpLabel> {
        self.view();
        self.overlay.labels(self.viewport.range())
    }

    /// Select the row labelled `digit` and paste it. Returns `Ok(None)` when
    /// the digit is not showing. A failed paste keeps the new selection.
    #[tracing::instrument(name = "engine.select_by_quick_index", skip(self))]
    pub async fn select_by_quick_index(&mut self, digit: u8) -> Result<Option<String>, HistoryError> {
        let view = self.view();
        let range = self.viewport.range();
        let Some(id) = self.selection.select_by_quick_index(digit, &view, &self.overlay, range) else {
            return Ok(None);
        };
        let entry = view
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(id.clone()))?;

        if let Err(e) = self.service.paste_entry(&entry).await {
            tracing::warn!(id = %id, error = %e, "Quick-jump paste failed");
            return Err(e);
        }
        Ok(Some(id))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Viewport
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record the latest scroll offset; applied on the next settle.
    pub fn on_scroll(&mut self, scroll_top: f64) {
        self.viewport.on_scroll(scroll_top);
    }

    pub fn on_resize(&mut self, viewport_height: f64) {
        self.viewport.on_resize(viewport_height);
    }

    /// Recompute the range from the most recent scroll offset and height.
    pub fn settle_viewport(&mut self) -> VisibleRange {
        let len = self.view().len();
        self.viewport.settle(len)
    }

    pub fn visible_range(&mut self) -> VisibleRange {
        self.view();
        self.viewport.range()
    }

    pub fn scroll_top(&self) -> f64 {
        self.viewport.scroll_top()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn renderer_for(&self, id: &str) -> Option<Renderer> {
        self.store.get(id).map(|entry| select_renderer(&entry))
    }

    /// Rows of the settled range with their renderer, digit and selection flag
    pub fn visible_rows(&mut self) -> Vec<VisibleRow> {
        let view = self.view();
        let range = self.viewport.range();
        let labels = self.quick_jump_labels();
        let selected = self.selection.selected_id();

        (range.start..range.end.min(view.len()))
            .map(|index| {
                let entry = view[index].clone();
                VisibleRow {
                    index,
                    renderer: select_renderer(&entry),
                    quick_jump_digit: labels.iter().find(|l| l.index == index).map(|l| l.digit),
                    selected: selected == Some(entry.id.as_str()),
                    entry,
                }
            })
            .collect()
    }

    /// Load the image behind an image entry as a URL the view can display.
    #[tracing::instrument(name = "engine.resolve_image_url", skip(self))]
    pub async fn resolve_image_url(&self, id: &str) -> Result<String, HistoryError> {
        let entry = self
            .store
            .get(id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        let file_path = match (&entry.file_path, &entry.content_data) {
            (Some(path), _) | (None, Some(path)) => path.clone(),
            (None, None) => return Err(HistoryError::Image(format!("Entry {} has no image path", id))),
        };
        let resolver = self
            .images
            .as_ref()
            .ok_or_else(|| HistoryError::Image("No image resolver configured".to_string()))?;
        resolver.resolve_image_url(&file_path).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────────

    /// Copy the selected entry back to the clipboard. `Ok(false)` when
    /// nothing is selected.
    #[tracing::instrument(name = "engine.copy_selected", skip(self))]
    pub async fn copy_selected(&mut self) -> Result<bool, HistoryError> {
        let Some(entry) = self.selected_entry() else {
            return Ok(false);
        };
        if let Err(e) = self.service.copy_to_clipboard(entry.text_content()).await {
            tracing::warn!(id = %entry.id, error = %e, "Copy to clipboard failed");
            return Err(e);
        }
        Ok(true)
    }

    /// Flip the favorite flag locally, then persist it. A persistence failure
    /// is returned but the local flip stays. `Ok(None)` when the entry is gone.
    #[tracing::instrument(name = "engine.toggle_favorite", skip(self), fields(id = %id))]
    pub async fn toggle_favorite(&mut self, id: &str) -> Result<Option<bool>, HistoryError> {
        let Some(local) = self.store.toggle_favorite(id) else {
            tracing::debug!("Favorite toggle on missing entry ignored");
            return Ok(None);
        };

        match self.service.toggle_favorite(id).await {
            Ok(remote) => {
                if remote != local {
                    tracing::debug!(local, remote, "Reconciling favorite with collaborator");
                    self.store.set_favorite(id, remote);
                }
                Ok(Some(remote))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist favorite");
                Err(e)
            }
        }
    }

    /// Delete through the collaborator, then locally. Nothing changes on
    /// failure. Returns whether a local entry was removed.
    #[tracing::instrument(name = "engine.delete", skip(self), fields(id = %id))]
    pub async fn delete(&mut self, id: &str) -> Result<bool, HistoryError> {
        if let Err(e) = self.service.delete(id).await {
            tracing::warn!(error = %e, "Failed to delete entry");
            return Err(e);
        }
        let removed = self.store.remove(id).is_some();
        self.sync();
        Ok(removed)
    }

    #[tracing::instrument(name = "engine.clear_all", skip(self))]
    pub async fn clear_all(&mut self) -> Result<usize, HistoryError> {
        if let Err(e) = self.service.clear_all().await {
            tracing::warn!(error = %e, "Failed to clear history");
            return Err(e);
        }
        let cleared = self.store.clear();
        self.selection.clear();
        self.viewport.on_scroll(0.0);
        self.sync();
        tracing::info!(cleared, "Cleared history");
        Ok(cleared)
    }

    pub fn statistics(&self) -> Statistics {
        self.store.statistics(
            self.config.history.most_copied_limit,
            self.config.history.recent_apps_limit,
        )
    }
}

impl Drop for HistoryEngine {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{ContentSubtype, RendererKind};
    use futures::channel::mpsc;
    use futures::stream::BoxStream;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MockService {
        history: Mutex<Vec<Entry>>,
        captures: Mutex<Option<mpsc::UnboundedReceiver<Entry>>>,
        favorites: Mutex<HashSet<String>>,
        fail_commands: AtomicBool,
        deleted: Mutex<Vec<String>>,
        copied: Mutex<Vec<String>>,
        pasted: Mutex<Vec<String>>,
    }

    impl MockService {
        fn failing(&self, fail: bool) {
            self.fail_commands.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), HistoryError> {
            if self.fail_commands.load(Ordering::SeqCst) {
                Err(HistoryError::Transport("collaborator unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl ClipboardService for MockService {
        fn subscribe_captures(&self) -> BoxStream<'static, Entry> {
            match self.captures.lock().take() {
                Some(rx) => rx.boxed(),
                None => futures::stream::empty().boxed(),
            }
        }

        async fn fetch_history(&self) -> Result<Vec<Entry>, HistoryError> {
            self.check()?;
            Ok(self.history.lock().clone())
        }

        async fn toggle_favorite(&self, id: &str) -> Result<bool, HistoryError> {
            self.check()?;
            let mut favorites = self.favorites.lock();
            if favorites.remove(id) {
                Ok(false)
            } else {
                favorites.insert(id.to_string());
                Ok(true)
            }
        }

        async fn delete(&self, id: &str) -> Result<(), HistoryError> {
            self.check()?;
            self.deleted.lock().push(id.to_string());
            Ok(())
        }

        async fn clear_all(&self) -> Result<(), HistoryError> {
            self.check()
        }

        async fn copy_to_clipboard(&self, content: &str) -> Result<(), HistoryError> {
            self.check()?;
            self.copied.lock().push(content.to_string());
            Ok(())
        }

        async fn paste_entry(&self, entry: &Entry) -> Result<(), HistoryError> {
            self.check()?;
            self.pasted.lock().push(entry.id.clone());
            Ok(())
        }
    }

    fn entries(n: usize) -> Vec<Entry> {
        (0..n).map(|i| Entry::new_text(format!("entry {}", i), None)).collect()
    }

    fn small_viewport() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.viewport.item_height = 64.0;
        config.viewport.initial_height = 128.0;
        config
    }

    async fn engine_with(history: Vec<Entry>, config: EngineConfig) -> (HistoryEngine, Arc<MockService>) {
        let service = Arc::new(MockService::default());
        *service.history.lock() = history;
        let mut engine = HistoryEngine::new(config, service.clone());
        engine.refresh().await.unwrap();
        (engine, service)
    }

    #[tokio::test]
    async fn test_refresh_selects_first() {
        let history = entries(3);
        let (mut engine, _) = engine_with(history.clone(), EngineConfig::default()).await;
        assert_eq!(engine.view().len(), 3);
        assert_eq!(engine.selected_id(), Some(history[0].id.clone()));
        assert_eq!(engine.visible_range(), VisibleRange { start: 0, end: 3 });
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_state() {
        let (mut engine, service) = engine_with(entries(2), EngineConfig::default()).await;
        *service.history.lock() = Vec::new();
        service.failing(true);

        assert!(matches!(engine.refresh().await, Err(HistoryError::Transport(_))));
        assert_eq!(engine.view().len(), 2);
    }

    #[tokio::test]
    async fn test_capture_selects_newest() {
        let history = entries(3);
        let (mut engine, _) = engine_with(history.clone(), EngineConfig::default()).await;
        engine.select_explicit(&history[2].id);

        let fresh = Entry::new_text("fresh", None);
        let outcome = engine.apply_capture(fresh.clone());
        assert_eq!(outcome, CaptureOutcome::Inserted { id: fresh.id.clone() });
        assert_eq!(engine.selected_id(), Some(fresh.id));

        // Re-capturing an older entry promotes and selects it.
        let again = Entry::new_text("entry 2", None);
        let outcome = engine.apply_capture(again);
        assert_eq!(outcome, CaptureOutcome::Promoted { id: history[2].id.clone(), copy_count: 2 });
        assert_eq!(engine.view()[0].id, history[2].id);
        assert_eq!(engine.selected_id(), Some(history[2].id.clone()));
    }

    #[tokio::test]
    async fn test_capture_outside_filter_keeps_selection() {
        let history = entries(2);
        let (mut engine, _) = engine_with(history.clone(), EngineConfig::default()).await;
        engine.set_search_term("entry");
        engine.select_explicit(&history[1].id);

        engine.apply_capture(Entry::new_text("unrelated", None));
        assert_eq!(engine.selected_id(), Some(history[1].id.clone()));
    }

    #[tokio::test]
    async fn test_navigation_wraps_and_scrolls() {
        let history = entries(20);
        let (mut engine, _) = engine_with(history.clone(), small_viewport()).await;
        assert_eq!(engine.visible_range(), VisibleRange { start: 0, end: 3 });

        assert_eq!(engine.select_previous(), Some(history[19].id.clone()));
        assert!(engine.visible_range().contains(19));

        assert_eq!(engine.select_next(), Some(history[0].id.clone()));
        assert!(engine.visible_range().contains(0));
        assert_eq!(engine.scroll_top(), 0.0);
    }

    #[tokio::test]
    async fn test_scroll_settles_on_latest_position() {
        let (mut engine, _) = engine_with(entries(50), small_viewport()).await;
        engine.on_scroll(640.0);
        engine.on_scroll(64.0);
        engine.on_scroll(320.0);
        assert_eq!(engine.visible_range(), VisibleRange { start: 0, end: 3 });
        assert_eq!(engine.settle_viewport(), VisibleRange { start: 5, end: 8 });
    }

    #[tokio::test]
    async fn test_direct_store_changes_resettle_range() {
        let history = entries(3);
        let (mut engine, _) = engine_with(history.clone(), EngineConfig::default()).await;
        engine.set_modifier_held(true);
        assert_eq!(engine.quick_jump_labels().len(), 3);

        engine.store().remove(&history[0].id);
        engine.store().remove(&history[1].id);

        assert_eq!(engine.visible_range(), VisibleRange { start: 0, end: 1 });
        let labels = engine.quick_jump_labels();
        assert_eq!(labels, vec![QuickJumpLabel { index: 0, digit: 1 }]);
        assert_eq!(engine.select_by_quick_index(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_favorite_is_optimistic() {
        let history = entries(1);
        let id = history[0].id.clone();
        let (mut engine, service) = engine_with(history, EngineConfig::default()).await;

        assert_eq!(engine.toggle_favorite(&id).await.unwrap(), Some(true));
        assert!(engine.store().get(&id).unwrap().is_favorite);

        service.failing(true);
        assert!(engine.toggle_favorite(&id).await.is_err());
        // No rollback.
        assert!(!engine.store().get(&id).unwrap().is_favorite);

        assert_eq!(engine.toggle_favorite("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_not_optimistic() {
        let history = entries(3);
        let (mut engine, service) = engine_with(history.clone(), EngineConfig::default()).await;
        engine.select_explicit(&history[1].id);

        service.failing(true);
        assert!(engine.delete(&history[1].id).await.is_err());
        assert_eq!(engine.view().len(), 3);
        assert_eq!(engine.selected_id(), Some(history[1].id.clone()));

        service.failing(false);
        assert!(engine.delete(&history[1].id).await.unwrap());
        assert_eq!(engine.view().len(), 2);
        assert_eq!(engine.selected_id(), Some(history[0].id.clone()));
        assert_eq!(*service.deleted.lock(), vec![history[1].id.clone()]);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (mut engine, service) = engine_with(entries(4), EngineConfig::default()).await;

        service.failing(true);
        assert!(engine.clear_all().await.is_err());
        assert_eq!(engine.view().len(), 4);

        service.failing(false);
        assert_eq!(engine.clear_all().await.unwrap(), 4);
        assert!(engine.view().is_empty());
        assert_eq!(engine.selected_id(), None);
        assert_eq!(engine.visible_range(), VisibleRange::default());
        assert!(engine.select_next().is_none());
    }

    #[tokio::test]
    async fn test_quick_jump_selects_and_pastes() {
        let history = entries(20);
        let (mut engine, service) = engine_with(history.clone(), small_viewport()).await;

        // Overlay inactive: ignored.
        assert_eq!(engine.select_by_quick_index(2).await.unwrap(), None);

        engine.set_modifier_held(true);
        let labels = engine.quick_jump_labels();
        assert_eq!(labels.len(), 3);

        assert_eq!(engine.select_by_quick_index(2).await.unwrap(), Some(history[1].id.clone()));
        assert_eq!(engine.selected_id(), Some(history[1].id.clone()));
        assert_eq!(*service.pasted.lock(), vec![history[1].id.clone()]);

        // Outside the visible range: ignored, nothing pasted.
        assert_eq!(engine.select_by_quick_index(5).await.unwrap(), None);
        assert_eq!(service.pasted.lock().len(), 1);

        // Labels follow the range while held.
        engine.on_scroll(640.0);
        engine.settle_viewport();
        assert_eq!(engine.quick_jump_labels()[0].index, 10);

        engine.set_modifier_held(false);
        assert!(engine.quick_jump_labels().is_empty());
    }

    #[tokio::test]
    async fn test_filters_reconcile_selection() {
        let history = vec![
            Entry::new_text("https://foo.example", None).with_subtype(ContentSubtype::Url),
            Entry::new_text("plain foo", None),
            Entry::new_text("https://bar.example", None).with_subtype(ContentSubtype::Url),
        ];
        let (mut engine, _) = engine_with(history.clone(), EngineConfig::default()).await;
        engine.select_explicit(&history[1].id);

        engine.set_type_filter("text:url");
        assert_eq!(engine.view().len(), 2);
        assert_eq!(engine.selected_id(), Some(history[0].id.clone()));

        engine.set_search_term("bar");
        assert_eq!(engine.selected_id(), Some(history[2].id.clone()));

        engine.set_search_term("nothing matches");
        assert_eq!(engine.selected_id(), None);
        assert!(engine.visible_rows().is_empty());
    }

    #[tokio::test]
    async fn test_copy_selected() {
        let history = entries(2);
        let (mut engine, service) = engine_with(history, EngineConfig::default()).await;
        assert!(engine.copy_selected().await.unwrap());
        assert_eq!(*service.copied.lock(), vec!["entry 0".to_string()]);
    }

    #[tokio::test]
    async fn test_run_captures_until_stream_ends() {
        let service = Arc::new(MockService::default());
        let (tx, rx) = mpsc::unbounded();
        *service.captures.lock() = Some(rx);
        let mut engine = HistoryEngine::new(EngineConfig::default(), service.clone());

        tx.unbounded_send(Entry::new_text("one", None)).unwrap();
        tx.unbounded_send(Entry::new_text("two", None)).unwrap();
        tx.unbounded_send(Entry::new_text("one", None)).unwrap();
        drop(tx);

        let applied = engine.run_captures(CancellationToken::new()).await.unwrap();
        assert_eq!(applied, 3);
        let view = engine.view();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].content_data.as_deref(), Some("one"));
        assert_eq!(view[0].copy_count, 2);
        assert_eq!(engine.selected_id(), Some(view[0].id.clone()));
    }

    #[tokio::test]
    async fn test_run_captures_stops_on_cancel() {
        let service = Arc::new(MockService::default());
        let (_tx, rx) = mpsc::unbounded::<Entry>();
        *service.captures.lock() = Some(rx);
        let mut engine = HistoryEngine::new(EngineConfig::default(), service);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(engine.run_captures(cancel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_events_are_broadcast() {
        let service = Arc::new(MockService::default());
        let mut engine = HistoryEngine::new(EngineConfig::default(), service);
        let mut events = engine.subscribe_events();

        let entry = Entry::new_text("hello", None);
        engine.apply_capture(entry.clone());
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Inserted { id: entry.id });

        let store = Arc::clone(engine.store());
        drop(engine);
        store.apply_capture(Entry::new_text("after drop", None));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_visible_rows_and_renderers() {
        let history = vec![
            Entry::new_text("#ff0000", None).with_subtype(ContentSubtype::Color),
            Entry::new_text("plain", None),
        ];
        let (mut engine, _) = engine_with(history.clone(), EngineConfig::default()).await;
        engine.set_modifier_held(true);

        let rows = engine.visible_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].renderer.kind(), RendererKind::Color);
        assert_eq!(rows[0].quick_jump_digit, Some(1));
        assert!(rows[0].selected);
        assert!(!rows[1].selected);

        assert_eq!(engine.renderer_for(&history[1].id).map(|r| r.kind()), Some(RendererKind::Text));
        assert!(engine.renderer_for("missing").is_none());
    }

    #[tokio::test]
    async fn test_resolve_image_url_via_config_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("imgs")).unwrap();
        std::fs::write(dir.path().join("imgs/cat.png"), [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let mut config = EngineConfig::default();
        config.images.root = Some(dir.path().to_path_buf());
        let image = Entry::new_image("imgs/cat.png", None);
        let (engine, _) = engine_with(vec![image.clone()], config).await;

        let url = engine.resolve_image_url(&image.id).await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(matches!(
            engine.resolve_image_url("missing").await,
            Err(HistoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_image_without_resolver() {
        let image = Entry::new_image("imgs/cat.png", None);
        let (engine, _) = engine_with(vec![image.clone()], EngineConfig::default()).await;
        assert!(matches!(engine.resolve_image_url(&image.id).await, Err(HistoryError::Image(_))));
    }
}
