//! Scroll progress calculation
//!
//! Maps the document's scroll state and the host region's geometry onto a
//! normalized progress value in `[0, 1]`. Everything here is a pure function
//! of its inputs.

use serde::{Deserialize, Serialize};

use crate::{LayoutAnchor, Rect};

/// How the controller measures the host region on every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStrategy {
    /// Read the region's bounding rectangle on every sample. Follows resizes
    /// and content reflow above the region.
    #[default]
    LiveRect,
    /// Capture `offsetTop`/`offsetHeight` once at mount and combine them with
    /// the global scroll offset. Goes stale if layout above the region shifts.
    CachedAnchor,
}

/// Normalize a scroll distance against the region's scrollable slack.
fn normalize(scroll_distance: f64, region_height: f64, viewport_height: f64) -> f64 {
    let distance = scroll_distance.max(0.0);
    let max_scroll = (region_height - viewport_height).max(0.0);
    if max_scroll <= 0.0 || !max_scroll.is_finite() || !distance.is_finite() {
        return 0.0;
    }
    (distance / max_scroll).clamp(0.0, 1.0)
}

/// Progress from the global scroll offset and a document-relative anchor.
pub fn progress_from_anchor(scroll_offset: f64, anchor: LayoutAnchor, viewport_height: f64) -> f64 {
    normalize(scroll_offset - anchor.top, anchor.height, viewport_height)
}

/// Progress from the region's live, viewport-relative bounding rectangle.
///
/// The region's top sits `-rect.y` pixels above the viewport once scrolled
/// past, which is the same distance `progress_from_anchor` derives from the
/// scroll offset.
pub fn progress_from_rect(rect: Rect, viewport_height: f64) -> f64 {
    normalize(-rect.y, rect.height, viewport_height)
}

/// Largest scroll distance that still changes progress.
pub fn max_scroll(region_height: f64, viewport_height: f64) -> f64 {
    (region_height - viewport_height).max(0.0)
}
