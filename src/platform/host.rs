/// Host environment capability: scroll/viewport queries, passive input
/// subscriptions, region visibility observation and frame scheduling.

use std::rc::Rc;

use crate::{LayoutAnchor, Rect, Result, Viewport};

/// Handler for scroll and touch notifications
pub type EventHandler = Rc<dyn Fn()>;

/// Handler for intersection notifications on the host region
pub type IntersectionHandler = Rc<dyn Fn(&[IntersectionEntry])>;

/// One-shot callback for the next display frame; receives the frame
/// timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Window-level input events the controller listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    Scroll,
    TouchMove,
    TouchEnd,
}

impl HostEvent {
    pub const ALL: [HostEvent; 3] = [HostEvent::Scroll, HostEvent::TouchMove, HostEvent::TouchEnd];

    /// DOM event type name
    pub fn as_str(&self) -> &'static str {
        match self {
            HostEvent::Scroll => "scroll",
            HostEvent::TouchMove => "touchmove",
            HostEvent::TouchEnd => "touchend",
        }
    }
}

/// A single visibility observation of the host region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

pub trait HostEnvironment {
    /// Current vertical scroll offset of the document
    fn scroll_offset(&self) -> f64;

    /// Current viewport size
    fn viewport(&self) -> Viewport;

    /// Document-relative top and height of the host region, or `None` when
    /// the region is not attached
    fn region_anchor(&self) -> Option<LayoutAnchor>;

    /// Live viewport-relative bounding rectangle of the host region, or
    /// `None` when the region is not attached
    fn region_rect(&self) -> Option<Rect>;

    /// Subscribe a passive (never `preventDefault`-ing) listener.
    fn add_listener(&self, event: HostEvent, handler: EventHandler) -> Result<ListenerId>;

    fn remove_listener(&self, id: ListenerId);

    /// Observe the host region's visibility, notifying whenever its
    /// intersection ratio crosses one of `thresholds`.
    fn observe_region(&self, thresholds: &[f64], handler: IntersectionHandler) -> Result<ObserverId>;

    fn disconnect_observer(&self, id: ObserverId);

    /// Schedule `cb` for the next display refresh.
    fn request_frame(&self, cb: FrameCallback) -> Result<FrameHandle>;

    /// Cancel a pending frame. Cancelling a handle that already fired is a
    /// no-op.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Host with no document: no region, no events, frames are never delivered
pub struct NoopHost;

impl NoopHost {
    pub fn new() -> Self {
        NoopHost
    }
}

impl Default for NoopHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment for NoopHost {
    fn scroll_offset(&self) -> f64 {
        0.0
    }

    fn viewport(&self) -> Viewport {
        Viewport::default()
    }

    fn region_anchor(&self) -> Option<LayoutAnchor> {
        None
    }

    fn region_rect(&self) -> Option<Rect> {
        None
    }

    fn add_listener(&self, _event: HostEvent, _handler: EventHandler) -> Result<ListenerId> {
        Ok(ListenerId(0))
    }

    fn remove_listener(&self, _id: ListenerId) {}

    fn observe_region(&self, _thresholds: &[f64], _handler: IntersectionHandler) -> Result<ObserverId> {
        Ok(ObserverId(0))
    }

    fn disconnect_observer(&self, _id: ObserverId) {}

    fn request_frame(&self, _cb: FrameCallback) -> Result<FrameHandle> {
        Ok(FrameHandle(0))
    }

    fn cancel_frame(&self, _handle: FrameHandle) {}
}
