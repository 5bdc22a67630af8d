//! Deterministic in-memory host and media surface
//!
//! `SimulatedHost` models a document with one host region: scrolling moves
//! the region's viewport-relative rectangle, dispatches listeners and
//! intersection observers the way a browser would, and frames only run when
//! the test (or the CLI) advances the clock. `SimulatedMedia` models a video
//! element with optional seek latency and write rejection.
//!
//! Both are cheap `Rc` handles: clone one into the controller and keep the
//! other to drive and inspect the simulation. Every dispatch is counted in
//! [`DispatchCounts`] so tests can check that nothing fires after teardown.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::platform::host::{
    EventHandler, FrameCallback, FrameHandle, HostEnvironment, HostEvent, IntersectionEntry,
    IntersectionHandler, ListenerId, ObserverId,
};
use crate::platform::media::{MediaSurface, ReadyState, INLINE_PLAYBACK_ATTRIBUTES};
use crate::progress::max_scroll;
use crate::{Error, LayoutAnchor, Rect, Result, Viewport};

/// How many callbacks the simulated host has delivered, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchCounts {
    pub scroll: u64,
    pub touch_move: u64,
    pub touch_end: u64,
    pub intersection: u64,
    pub frames: u64,
}

struct Observer {
    id: ObserverId,
    thresholds: Vec<f64>,
    handler: IntersectionHandler,
    last: Cell<Option<(bool, usize)>>,
}

struct HostState {
    viewport: Cell<Viewport>,
    scroll_y: Cell<f64>,
    region: Cell<Option<LayoutAnchor>>,
    trailing_height: Cell<f64>,
    listeners: RefCell<Vec<(ListenerId, HostEvent, EventHandler)>>,
    observers: RefCell<Vec<Rc<Observer>>>,
    frames: RefCell<Vec<(FrameHandle, FrameCallback)>>,
    next_id: Cell<u64>,
    clock_ms: Cell<f64>,
    counts: Cell<DispatchCounts>,
}

#[derive(Clone)]
pub struct SimulatedHost {
    state: Rc<HostState>,
}

impl SimulatedHost {
    /// A document whose host region starts `region_top` pixels down and is
    /// `region_height` pixels tall, scrolled to the top.
    pub fn new(viewport: Viewport, region_top: f64, region_height: f64) -> Self {
        SimulatedHost {
            state: Rc::new(HostState {
                viewport: Cell::new(viewport),
                scroll_y: Cell::new(0.0),
                region: Cell::new(Some(LayoutAnchor {
                    top: region_top,
                    height: region_height,
                })),
                trailing_height: Cell::new(0.0),
                listeners: RefCell::new(Vec::new()),
                observers: RefCell::new(Vec::new()),
                frames: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                clock_ms: Cell::new(0.0),
                counts: Cell::new(DispatchCounts::default()),
            }),
        }
    }

    /// A document with no host region (unmounted before setup ran).
    pub fn detached(viewport: Viewport) -> Self {
        let host = SimulatedHost::new(viewport, 0.0, 0.0);
        host.state.region.set(None);
        host
    }

    fn next_id(&self) -> u64 {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        id
    }

    fn bump(&self, f: impl FnOnce(&mut DispatchCounts)) {
        let mut c = self.state.counts.get();
        f(&mut c);
        self.state.counts.set(c);
    }

    /// Content below the host region (e.g. a footer), which lets the
    /// document scroll past the region's end.
    pub fn set_trailing_height(&self, px: f64) {
        self.state.trailing_height.set(px.max(0.0));
    }

    /// Largest reachable scroll offset
    pub fn max_scroll_offset(&self) -> f64 {
        let content = self
            .state
            .region
            .get()
            .map(|r| r.top + r.height)
            .unwrap_or(0.0)
            + self.state.trailing_height.get();
        (content - self.state.viewport.get().height).max(0.0)
    }

    /// Scroll offset at which the region has been scrolled through by
    /// `progress` (0..=1) of its scrollable extent.
    pub fn offset_for_progress(&self, progress: f64) -> f64 {
        match self.state.region.get() {
            Some(r) => {
                let extent = max_scroll(r.height, self.state.viewport.get().height);
                r.top + extent * progress.clamp(0.0, 1.0)
            }
            None => 0.0,
        }
    }

    fn set_scroll(&self, y: f64) {
        let clamped = y.clamp(0.0, self.max_scroll_offset());
        self.state.scroll_y.set(clamped);
    }

    /// Scroll to `y` and deliver `scroll` plus any intersection changes.
    pub fn scroll_to(&self, y: f64) {
        self.set_scroll(y);
        self.dispatch(HostEvent::Scroll);
        self.check_intersections();
    }

    /// Move the scroll position without delivering any scroll event, as a
    /// touch device does when it coalesces or throttles scroll events.
    pub fn scroll_silently(&self, y: f64) {
        self.set_scroll(y);
    }

    /// A finger drag to `y`: the position moves and only `touchmove` fires.
    pub fn touch_move(&self, y: f64) {
        self.set_scroll(y);
        self.dispatch(HostEvent::TouchMove);
    }

    pub fn touch_end(&self) {
        self.dispatch(HostEvent::TouchEnd);
    }

    /// Content above the region grew or shrank by `dy` pixels. No event is
    /// delivered; only live measurement sees the change.
    pub fn shift_layout(&self, dy: f64) {
        if let Some(mut r) = self.state.region.get() {
            r.top += dy;
            self.state.region.set(Some(r));
        }
    }

    pub fn resize(&self, viewport: Viewport) {
        self.state.viewport.set(viewport);
        self.set_scroll(self.state.scroll_y.get());
        self.check_intersections();
    }

    /// Deliver `event` to every listener subscribed to it.
    pub fn dispatch(&self, event: HostEvent) {
        let handlers: Vec<EventHandler> = self
            .state
            .listeners
            .borrow()
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();
        for h in handlers {
            self.bump(|c| match event {
                HostEvent::Scroll => c.scroll += 1,
                HostEvent::TouchMove => c.touch_move += 1,
                HostEvent::TouchEnd => c.touch_end += 1,
            });
            h();
        }
    }

    fn intersection(&self) -> Option<IntersectionEntry> {
        let rect = self.region_rect()?;
        let vh = self.state.viewport.get().height;
        let visible = (rect.y + rect.height).min(vh) - rect.y.max(0.0);
        let ratio = if rect.height > 0.0 {
            (visible.max(0.0) / rect.height).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(IntersectionEntry {
            is_intersecting: visible > 0.0,
            intersection_ratio: ratio,
        })
    }

    fn check_intersections(&self) {
        let Some(entry) = self.intersection() else {
            return;
        };
        let observers: Vec<Rc<Observer>> = self.state.observers.borrow().iter().cloned().collect();
        for obs in observers {
            self.notify_observer(&obs, entry, false);
        }
    }

    fn notify_observer(&self, obs: &Observer, entry: IntersectionEntry, force: bool) {
        let crossed = obs
            .thresholds
            .iter()
            .filter(|t| entry.intersection_ratio >= **t)
            .count();
        let key = (entry.is_intersecting, crossed);
        if !force && obs.last.get() == Some(key) {
            return;
        }
        obs.last.set(Some(key));
        self.bump(|c| c.intersection += 1);
        (obs.handler)(&[entry]);
    }

    /// Run every frame callback that was pending before this call, with the
    /// clock advanced by `dt_ms`. Callbacks scheduled while running wait for
    /// the next frame.
    pub fn advance_frame(&self, dt_ms: f64) {
        let now = self.state.clock_ms.get() + dt_ms;
        self.state.clock_ms.set(now);
        let due = std::mem::take(&mut *self.state.frames.borrow_mut());
        for (_, cb) in due {
            self.bump(|c| c.frames += 1);
            cb(now);
        }
    }

    pub fn run_frames(&self, n: usize, dt_ms: f64) {
        for _ in 0..n {
            self.advance_frame(dt_ms);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    pub fn observer_count(&self) -> usize {
        self.state.observers.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.frames.borrow().len()
    }

    pub fn counts(&self) -> DispatchCounts {
        self.state.counts.get()
    }

    pub fn clock_ms(&self) -> f64 {
        self.state.clock_ms.get()
    }
}

impl HostEnvironment for SimulatedHost {
    fn scroll_offset(&self) -> f64 {
        self.state.scroll_y.get()
    }

    fn viewport(&self) -> Viewport {
        self.state.viewport.get()
    }

    fn region_anchor(&self) -> Option<LayoutAnchor> {
        self.state.region.get()
    }

    fn region_rect(&self) -> Option<Rect> {
        let r = self.state.region.get()?;
        Some(Rect {
            x: 0.0,
            y: r.top - self.state.scroll_y.get(),
            width: self.state.viewport.get().width,
            height: r.height,
        })
    }

    fn add_listener(&self, event: HostEvent, handler: EventHandler) -> Result<ListenerId> {
        let id = ListenerId(self.next_id());
        self.state.listeners.borrow_mut().push((id, event, handler));
        Ok(id)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.state.listeners.borrow_mut().retain(|(l, _, _)| *l != id);
    }

    fn observe_region(&self, thresholds: &[f64], handler: IntersectionHandler) -> Result<ObserverId> {
        if self.state.region.get().is_none() {
            return Err(Error::HostError("no region to observe".into()));
        }
        let id = ObserverId(self.next_id());
        let obs = Rc::new(Observer {
            id,
            thresholds: thresholds.to_vec(),
            handler,
            last: Cell::new(None),
        });
        self.state.observers.borrow_mut().push(Rc::clone(&obs));
        // Observers report the initial state once right after observing.
        if let Some(entry) = self.intersection() {
            self.notify_observer(&obs, entry, true);
        }
        Ok(id)
    }

    fn disconnect_observer(&self, id: ObserverId) {
        self.state.observers.borrow_mut().retain(|o| o.id != id);
    }

    fn request_frame(&self, cb: FrameCallback) -> Result<FrameHandle> {
        let handle = FrameHandle(self.next_id());
        self.state.frames.borrow_mut().push((handle, cb));
        Ok(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.state.frames.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

struct MediaState {
    attached: Cell<bool>,
    duration: Cell<f64>,
    current: Cell<f64>,
    ready: Cell<ReadyState>,
    seeking: Cell<bool>,
    seek_latency: Cell<u32>,
    seek_remaining: Cell<u32>,
    reject_writes: Cell<bool>,
    writes: RefCell<Vec<f64>>,
    attributes: RefCell<Vec<(String, String)>>,
    metadata_listeners: RefCell<Vec<(ListenerId, EventHandler)>>,
    next_id: Cell<u64>,
}

/// In-memory video element
#[derive(Clone)]
pub struct SimulatedMedia {
    state: Rc<MediaState>,
}

impl SimulatedMedia {
    pub fn new() -> Self {
        SimulatedMedia {
            state: Rc::new(MediaState {
                attached: Cell::new(true),
                duration: Cell::new(f64::NAN),
                current: Cell::new(0.0),
                ready: Cell::new(ReadyState::HaveNothing),
                seeking: Cell::new(false),
                seek_latency: Cell::new(0),
                seek_remaining: Cell::new(0),
                reject_writes: Cell::new(false),
                writes: RefCell::new(Vec::new()),
                attributes: RefCell::new(Vec::new()),
                metadata_listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    pub fn detached() -> Self {
        let m = SimulatedMedia::new();
        m.state.attached.set(false);
        m
    }

    /// Metadata arrives: duration becomes known, enough data is buffered to
    /// seek, and metadata listeners fire.
    pub fn load_metadata(&self, duration: f64) {
        self.state.duration.set(duration);
        self.state.ready.set(ReadyState::HaveEnoughData);
        let handlers: Vec<EventHandler> = self
            .state
            .metadata_listeners
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for h in handlers {
            h();
        }
    }

    pub fn set_ready_state(&self, ready: ReadyState) {
        self.state.ready.set(ready);
    }

    /// Each accepted write keeps `seeking` raised for `frames` decode ticks.
    pub fn set_seek_latency(&self, frames: u32) {
        self.state.seek_latency.set(frames);
    }

    pub fn set_seeking(&self, seeking: bool) {
        self.state.seeking.set(seeking);
        if !seeking {
            self.state.seek_remaining.set(0);
        }
    }

    /// Reject every position write, like a host refusing a seek.
    pub fn set_reject_writes(&self, reject: bool) {
        self.state.reject_writes.set(reject);
    }

    /// Advance the decoder by one tick, resolving a pending seek when its
    /// latency has elapsed.
    pub fn decode_tick(&self) {
        let remaining = self.state.seek_remaining.get();
        if remaining > 0 {
            self.state.seek_remaining.set(remaining - 1);
            if remaining == 1 {
                self.state.seeking.set(false);
            }
        }
    }

    /// Every accepted position write, in order
    pub fn writes(&self) -> Vec<f64> {
        self.state.writes.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.writes.borrow().len()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.state
            .attributes
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn metadata_listener_count(&self) -> usize {
        self.state.metadata_listeners.borrow().len()
    }
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSurface for SimulatedMedia {
    fn is_attached(&self) -> bool {
        self.state.attached.get()
    }

    fn duration(&self) -> f64 {
        self.state.duration.get()
    }

    fn current_time(&self) -> f64 {
        self.state.current.get()
    }

    fn set_current_time(&self, seconds: f64) -> Result<()> {
        if self.state.reject_writes.get() {
            return Err(Error::SeekRejected {
                time: seconds,
                reason: "position writes are disabled".into(),
            });
        }
        if !seconds.is_finite() {
            return Err(Error::SeekRejected {
                time: seconds,
                reason: "position must be finite".into(),
            });
        }
        let duration = self.state.duration.get();
        let clamped = if duration.is_finite() {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };
        self.state.current.set(clamped);
        self.state.writes.borrow_mut().push(clamped);
        let latency = self.state.seek_latency.get();
        if latency > 0 {
            self.state.seeking.set(true);
            self.state.seek_remaining.set(latency);
        }
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.state.ready.get()
    }

    fn seeking(&self) -> bool {
        self.state.seeking.get()
    }

    fn configure_inline_playback(&self) {
        let mut attrs = self.state.attributes.borrow_mut();
        for (name, value) in INLINE_PLAYBACK_ATTRIBUTES {
            attrs.retain(|(n, _)| n != name);
            attrs.push((name.to_string(), value.to_string()));
        }
        attrs.retain(|(n, _)| n != "autoplay");
    }

    fn on_metadata_loaded(&self, handler: EventHandler) -> Result<ListenerId> {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        self.state
            .metadata_listeners
            .borrow_mut()
            .push((ListenerId(id), handler));
        Ok(ListenerId(id))
    }

    fn remove_listener(&self, id: ListenerId) {
        self.state
            .metadata_listeners
            .borrow_mut()
            .retain(|(l, _)| *l != id);
    }
}
