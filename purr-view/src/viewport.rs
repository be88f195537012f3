//! Visible-range tracking and the quick-jump overlay
//!
//! Visibility is estimated from a fixed per-row height rather than measured,
//! so the whole module works on plain numbers.

use crate::interface::VisibleRange;

/// Digits the overlay can ever show (1..=9)
pub const MAX_QUICK_JUMP_DIGITS: u8 = 9;

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Rows intersecting `[scroll_top, scroll_top + viewport_height)`, plus one
/// for a partially visible trailing row.
///
/// Always `0 <= start <= end <= item_count`. Negative or NaN scroll offsets
/// and heights count as zero; a non-positive row height yields an empty range.
pub fn compute_visible_range(
    scroll_top: f64,
    viewport_height: f64,
    item_height: f64,
    item_count: usize,
) -> VisibleRange {
    let item_height = sanitize(item_height);
    if item_height == 0.0 {
        return VisibleRange::default();
    }
    let scroll_top = sanitize(scroll_top);
    let viewport_height = sanitize(viewport_height);

    // Float-to-int casts saturate, so huge offsets clamp instead of wrapping.
    let start = ((scroll_top / item_height).floor() as usize).min(item_count);
    let rows = (viewport_height / item_height).ceil() as usize;
    let end = start.saturating_add(rows).saturating_add(1).min(item_count);
    VisibleRange { start, end }
}

/// Owns the visible range. Scroll and resize events only record the latest
/// input; `settle` turns them into a range.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    item_height: f64,
    scroll_top: f64,
    viewport_height: f64,
    range: VisibleRange,
    dirty: bool,
}

impl ViewportTracker {
    pub fn new(item_height: f64, viewport_height: f64) -> Self {
        Self {
            item_height: sanitize(item_height),
            scroll_top: 0.0,
            viewport_height: sanitize(viewport_height),
            range: VisibleRange::default(),
            dirty: true,
        }
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Last settled range
    pub fn range(&self) -> VisibleRange {
        self.range
    }

    /// True when inputs changed since the last settle
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn on_scroll(&mut self, scroll_top: f64) {
        self.scroll_top = sanitize(scroll_top);
        self.dirty = true;
    }

    pub fn on_resize(&mut self, viewport_height: f64) {
        self.viewport_height = sanitize(viewport_height);
        self.dirty = true;
    }

    /// Recompute from the most recent scroll offset and height. The offset is
    /// first clamped to what a container of `item_count` rows can scroll to.
    pub fn settle(&mut self, item_count: usize) -> VisibleRange {
        let max_scroll = (item_count as f64 * self.item_height - self.viewport_height).max(0.0);
        self.scroll_top = self.scroll_top.min(max_scroll);
        self.range = compute_visible_range(self.scroll_top, self.viewport_height, self.item_height, item_count);
        self.dirty = false;
        self.range
    }

    /// Move the offset the least amount that makes row `index` fully visible.
    /// Returns the new offset when it changed; the next `settle` applies it.
    pub fn scroll_into_view(&mut self, index: usize) -> Option<f64> {
        if self.item_height == 0.0 {
            return None;
        }
        let top = index as f64 * self.item_height;
        let bottom = top + self.item_height;

        let target = if top < self.scroll_top {
            top
        } else if bottom > self.scroll_top + self.viewport_height {
            (bottom - self.viewport_height).max(0.0)
        } else {
            return None;
        };

        self.scroll_top = target;
        self.dirty = true;
        Some(target)
    }
}

/// One digit shown next to a visible row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickJumpLabel {
    pub index: usize,
    pub digit: u8,
}

/// Digit labels shown while the modifier key is held
#[derive(Debug, Clone)]
pub struct QuickJumpOverlay {
    active: bool,
    max_digits: u8,
}

impl QuickJumpOverlay {
    pub fn new(max_digits: u8) -> Self {
        Self {
            active: false,
            max_digits: max_digits.clamp(1, MAX_QUICK_JUMP_DIGITS),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Labels for the first rows of `range`; empty while inactive. Computed
    /// from the range passed in, so a range change is reflected on the next call.
    pub fn labels(&self, range: VisibleRange) -> Vec<QuickJumpLabel> {
        if !self.active {
            return Vec::new();
        }
        (range.start..range.end)
            .zip(1..=self.max_digits)
            .map(|(index, digit)| QuickJumpLabel { index, digit })
            .collect()
    }

    pub fn index_for_digit(&self, digit: u8, range: VisibleRange) -> Option<usize> {
        if !self.active || digit == 0 || digit > self.max_digits {
            return None;
        }
        let index = range.start + usize::from(digit) - 1;
        range.contains(index).then_some(index)
    }
}

impl Default for QuickJumpOverlay {
    fn default() -> Self {
        Self::new(MAX_QUICK_JUMP_DIGITS)
    }
}
