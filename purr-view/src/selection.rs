//! Single selection over the derived view
//!
//! The controller owns `selected_id` and is always handed the current view;
//! it never caches indices, so a mutated view can't leave it pointing at a
//! stale position.

use crate::interface::VisibleRange;
use crate::models::Entry;
use crate::viewport::QuickJumpOverlay;

/// Ask the viewport to bring this view index into view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavOutcome {
    pub selected_id: String,
    pub scroll: ScrollRequest,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selected_id: Option<String>,
}

fn position(view: &[Entry], id: &str) -> Option<usize> {
    view.iter().position(|entry| entry.id == id)
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    /// Index of the selection within `view`
    pub fn selected_index(&self, view: &[Entry]) -> Option<usize> {
        position(view, self.selected_id.as_deref()?)
    }

    /// Re-resolve against a new view: keep a selection that is still present,
    /// otherwise fall back to the first entry (or nothing on an empty view).
    pub fn reconcile(&mut self, view: &[Entry]) -> Option<&str> {
        let still_present = self
            .selected_id
            .as_deref()
            .is_some_and(|id| position(view, id).is_some());
        if !still_present {
            let next = view.first().map(|entry| entry.id.clone());
            if self.selected_id.is_some() {
                tracing::debug!(previous = ?self.selected_id, next = ?next, "Selection fell out of view");
            }
            self.selected_id = next;
        }
        self.selected_id.as_deref()
    }

    pub fn select_next(&mut self, view: &[Entry]) -> Option<NavOutcome> {
        self.step(view, true)
    }

    pub fn select_previous(&mut self, view: &[Entry]) -> Option<NavOutcome> {
        self.step(view, false)
    }

    fn step(&mut self, view: &[Entry], forward: bool) -> Option<NavOutcome> {
        if view.is_empty() {
            return None;
        }
        let len = view.len();
        let index = match self.selected_index(view) {
            Some(current) if forward => (current + 1) % len,
            Some(current) => (current + len - 1) % len,
            // Nothing valid selected: land on the top of the list either way.
            None => 0,
        };
        Some(self.select_index(view, index))
    }

    fn select_index(&mut self, view: &[Entry], index: usize) -> NavOutcome {
        let selected_id = view[index].id.clone();
        self.selected_id = Some(selected_id.clone());
        NavOutcome { selected_id, scroll: ScrollRequest { index } }
    }

    /// Select through the quick-jump overlay. Ignored unless the overlay is
    /// active and `digit` labels an index inside `range`.
    pub fn select_by_quick_index(
        &mut self,
        digit: u8,
        view: &[Entry],
        overlay: &QuickJumpOverlay,
        range: VisibleRange,
    ) -> Option<String> {
        let index = overlay.index_for_digit(digit, range)?;
        if index >= view.len() {
            return None;
        }
        Some(self.select_index(view, index).selected_id)
    }

    /// Direct selection; refused when `id` isn't in the view.
    pub fn select_explicit(&mut self, id: &str, view: &[Entry]) -> bool {
        if position(view, id).is_none() {
            return false;
        }
        self.selected_id = Some(id.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.selected_id = None;
    }
}
