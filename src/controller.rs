//! Scroll-synced playback controller
//!
//! [`ScrollVideoController::mount`] wires a host environment and a media
//! surface together:
//!
//! - passive `scroll`, `touchmove` and `touchend` listeners plus an
//!   intersection observer on the host region recompute scroll progress and
//!   retarget playback immediately on discrete input;
//! - a frame loop recomputes progress on every display refresh as well, so
//!   throttled or coalesced scroll events on touch devices are still picked
//!   up, and eases the video position toward the target;
//! - a loading gate flips once when the media's metadata arrives.
//!
//! Both input paths run on the host's single UI thread and share the
//! session through an `Rc<RefCell<_>>`. Unmounting (explicitly or on drop)
//! removes every subscription, disconnects the observer and cancels the
//! pending frame exactly once.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, trace, warn};
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::loading::LoadingGate;
use crate::platform::{
    visibility_thresholds, EventHandler, FrameHandle, HostEnvironment, HostEvent,
    IntersectionEntry, ListenerId, MediaSurface, ObserverId,
};
use crate::progress::{progress_from_anchor, progress_from_rect, ProgressStrategy};
use crate::smoothing::{known_duration, SmoothingParams};
use crate::{LayoutAnchor, Result};

/// Counters describing what a controller has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Event-path samples (scroll, touch, intersection, initial)
    pub event_samples: u64,
    /// Frame-loop ticks, including ones cut short by the readiness gate
    pub frame_ticks: u64,
    /// Ticks skipped because the surface could not accept a position yet
    pub unready_ticks: u64,
    /// Times the target time actually changed
    pub target_updates: u64,
    /// Accepted position writes
    pub position_writes: u64,
    /// Position writes the surface refused
    pub rejected_writes: u64,
    /// Writes held back because the surface was still seeking
    pub seek_skips: u64,
}

struct Session {
    strategy: ProgressStrategy,
    params: SmoothingParams,
    /// Layout captured at mount, used by `ProgressStrategy::CachedAnchor`
    anchor: LayoutAnchor,
    target_time: f64,
    last_progress: Option<f64>,
    stats: SessionStats,
}

struct Core {
    host: Rc<dyn HostEnvironment>,
    media: Rc<dyn MediaSurface>,
    session: RefCell<Session>,
    loading: LoadingGate,
    alive: Cell<bool>,
}

impl Core {
    fn progress(&self, session: &Session) -> Option<f64> {
        let viewport = self.host.viewport();
        match session.strategy {
            ProgressStrategy::LiveRect => self
                .host
                .region_rect()
                .map(|rect| progress_from_rect(rect, viewport.height)),
            ProgressStrategy::CachedAnchor => Some(progress_from_anchor(
                self.host.scroll_offset(),
                session.anchor,
                viewport.height,
            )),
        }
    }

    /// Retarget playback from `progress` if the duration is usable and the
    /// progress moved by more than epsilon since the last applied value.
    fn apply_progress(&self, session: &mut Session, progress: f64) {
        let Some(duration) = known_duration(self.media.duration()) else {
            return;
        };
        if !session.params.progress_changed(progress, session.last_progress) {
            return;
        }
        let target = progress * duration;
        session.last_progress = Some(progress);
        if target != session.target_time {
            session.target_time = target;
            session.stats.target_updates += 1;
            trace!("target time {:.3}s (progress {:.4})", target, progress);
        }
    }

    fn sample(&self) {
        if !self.alive.get() {
            return;
        }
        let mut session = self.session.borrow_mut();
        session.stats.event_samples += 1;
        if let Some(p) = self.progress(&session) {
            self.apply_progress(&mut session, p);
        }
    }

    fn tick(&self) {
        if !self.alive.get() {
            return;
        }
        let next = {
            let mut session = self.session.borrow_mut();
            session.stats.frame_ticks += 1;

            if !self.media.ready_state().can_seek() {
                session.stats.unready_ticks += 1;
                return;
            }

            if let Some(p) = self.progress(&session) {
                self.apply_progress(&mut session, p);
            }

            let Some(next) = session
                .params
                .step(session.target_time, self.media.current_time())
            else {
                return;
            };
            // Writing while a previous seek is still resolving tears frames.
            if self.media.seeking() {
                session.stats.seek_skips += 1;
                return;
            }
            next
        };

        let result = self.media.set_current_time(next);
        let mut session = self.session.borrow_mut();
        match result {
            Ok(()) => session.stats.position_writes += 1,
            Err(e) => {
                session.stats.rejected_writes += 1;
                warn!("Video currentTime update failed: {}", e);
            }
        }
    }
}

struct FrameLoopState {
    host: Rc<dyn HostEnvironment>,
    pending: Cell<Option<FrameHandle>>,
    running: Cell<bool>,
}

/// Per-frame driver. Each delivered frame runs `tick` and schedules the next
/// one until [`FrameLoop::stop`] cancels the pending frame.
struct FrameLoop {
    state: Rc<FrameLoopState>,
}

impl FrameLoop {
    fn start(host: Rc<dyn HostEnvironment>, tick: Rc<dyn Fn(f64)>) -> Result<Self> {
        let state = Rc::new(FrameLoopState {
            host,
            pending: Cell::new(None),
            running: Cell::new(true),
        });
        FrameLoop::schedule(&state, tick)?;
        Ok(FrameLoop { state })
    }

    fn schedule(state: &Rc<FrameLoopState>, tick: Rc<dyn Fn(f64)>) -> Result<()> {
        let weak = Rc::downgrade(state);
        let handle = state.host.request_frame(Box::new(move |timestamp: f64| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            state.pending.set(None);
            if !state.running.get() {
                return;
            }
            tick(timestamp);
            if state.running.get() {
                if let Err(e) = FrameLoop::schedule(&state, tick) {
                    state.running.set(false);
                    warn!("Frame loop stopped, could not schedule next frame: {}", e);
                }
            }
        }))?;
        state.pending.set(Some(handle));
        Ok(())
    }

    fn stop(&self) {
        if self.state.running.replace(false) {
            if let Some(handle) = self.state.pending.take() {
                self.state.host.cancel_frame(handle);
            }
        }
    }
}

struct Subscriptions {
    listeners: Vec<ListenerId>,
    metadata: Option<ListenerId>,
    observer: Option<ObserverId>,
    frame_loop: Option<FrameLoop>,
}

impl Subscriptions {
    fn release(self, core: &Core) {
        for id in self.listeners {
            core.host.remove_listener(id);
        }
        if let Some(id) = self.metadata {
            core.media.remove_listener(id);
        }
        if let Some(id) = self.observer {
            core.host.disconnect_observer(id);
        }
        if let Some(frame_loop) = self.frame_loop {
            frame_loop.stop();
        }
    }
}

/// A mounted scroll video controller
///
/// One instance per host region; instances never share state.
pub struct ScrollVideoController {
    core: Rc<Core>,
    subscriptions: Option<Subscriptions>,
}

impl ScrollVideoController {
    /// Mount against `host` and `media` and start synchronizing.
    ///
    /// If either the host region or the media surface is missing, or a
    /// registration fails part-way, the controller comes back inert with no
    /// subscriptions left behind.
    pub fn mount<H, M>(host: H, media: M, config: &ControllerConfig) -> Self
    where
        H: HostEnvironment + 'static,
        M: MediaSurface + 'static,
    {
        let host: Rc<dyn HostEnvironment> = Rc::new(host);
        let media: Rc<dyn MediaSurface> = Rc::new(media);
        let anchor = host.region_anchor();

        let core = Rc::new(Core {
            host,
            media,
            session: RefCell::new(Session {
                strategy: config.strategy,
                params: config.smoothing,
                anchor: anchor.unwrap_or_default(),
                target_time: 0.0,
                last_progress: None,
                stats: SessionStats::default(),
            }),
            loading: LoadingGate::new(),
            alive: Cell::new(false),
        });

        let mut controller = ScrollVideoController {
            core,
            subscriptions: None,
        };

        if anchor.is_none() || !controller.core.media.is_attached() {
            debug!("host region or media surface missing; controller left inert");
            return controller;
        }

        controller.core.media.configure_inline_playback();
        controller.core.alive.set(true);

        let mut subs = Subscriptions {
            listeners: Vec::new(),
            metadata: None,
            observer: None,
            frame_loop: None,
        };
        match controller.subscribe(&mut subs) {
            Ok(()) => {
                controller.subscriptions = Some(subs);
                debug!(
                    "scroll video mounted for {} ({:?})",
                    config.source, config.strategy
                );
                controller.core.sample();
            }
            Err(e) => {
                warn!("scroll video setup failed, leaving controller inert: {}", e);
                controller.core.alive.set(false);
                subs.release(&controller.core);
            }
        }
        controller
    }

    fn subscribe(&self, subs: &mut Subscriptions) -> Result<()> {
        let core = &self.core;

        let weak: Weak<Core> = Rc::downgrade(core);
        let on_metadata: EventHandler = Rc::new(move || {
            if let Some(core) = weak.upgrade() {
                if core.alive.get() && core.loading.mark_ready() {
                    debug!("media metadata loaded, duration {:.3}s", core.media.duration());
                }
            }
        });
        subs.metadata = Some(core.media.on_metadata_loaded(on_metadata)?);
        // Metadata may already be there (cached asset) before we subscribed.
        if known_duration(core.media.duration()).is_some() {
            core.loading.mark_ready();
        }

        let weak = Rc::downgrade(core);
        let on_input: EventHandler = Rc::new(move || {
            if let Some(core) = weak.upgrade() {
                core.sample();
            }
        });
        for event in HostEvent::ALL {
            subs.listeners
                .push(core.host.add_listener(event, Rc::clone(&on_input))?);
        }

        let weak = Rc::downgrade(core);
        subs.observer = Some(core.host.observe_region(
            &visibility_thresholds(),
            Rc::new(move |entries: &[IntersectionEntry]| {
                if !entries.iter().any(|e| e.is_intersecting) {
                    return;
                }
                if let Some(core) = weak.upgrade() {
                    core.sample();
                }
            }),
        )?);

        let weak = Rc::downgrade(core);
        subs.frame_loop = Some(FrameLoop::start(
            Rc::clone(&core.host),
            Rc::new(move |_timestamp: f64| {
                if let Some(core) = weak.upgrade() {
                    core.tick();
                }
            }),
        )?);
        Ok(())
    }

    /// Tear down every subscription. Safe to call more than once; only the
    /// first call does anything.
    pub fn unmount(&mut self) {
        if let Some(subs) = self.subscriptions.take() {
            self.core.alive.set(false);
            subs.release(&self.core);
            debug!("scroll video unmounted");
        }
    }

    /// Whether subscriptions are live
    pub fn is_active(&self) -> bool {
        self.subscriptions.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.core.loading.is_loading()
    }

    /// Register a callback for the single loading -> ready transition, the
    /// only state change that needs a re-render.
    pub fn on_ready<F>(&self, cb: F)
    where
        F: FnMut() + 'static,
    {
        self.core.loading.on_ready(cb);
    }

    /// Playback position the controller is steering toward, in seconds
    pub fn target_time(&self) -> f64 {
        self.core.session.borrow().target_time
    }

    /// Most recent progress that produced a target, if any
    pub fn last_progress(&self) -> Option<f64> {
        self.core.session.borrow().last_progress
    }

    /// Progress computed from the host's current state
    pub fn current_progress(&self) -> Option<f64> {
        let session = self.core.session.borrow();
        self.core.progress(&session)
    }

    pub fn stats(&self) -> SessionStats {
        self.core.session.borrow().stats
    }
}

impl Drop for ScrollVideoController {
    fn drop(&mut self) {
        self.unmount();
    }
}
