//! Browser backend over `web-sys`
//!
//! [`WebHost`] adapts the window and the host region element, [`WebMedia`]
//! adapts an `HTMLVideoElement`. Every closure handed to the browser is kept
//! in a map keyed by its subscription id so that removal drops exactly the
//! closure that was registered.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Array;
use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AddEventListenerOptions, HtmlElement, HtmlVideoElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, Window,
};

use crate::controller::ScrollVideoController;
use crate::platform::{
    EventHandler, FrameCallback, FrameHandle, HostEnvironment, HostEvent, IntersectionEntry,
    IntersectionHandler, ListenerId, MediaSurface, ObserverId, ReadyState,
    INLINE_PLAYBACK_ATTRIBUTES,
};
use crate::{ControllerConfig, Error, LayoutAnchor, Rect, Result, Viewport};

fn js_err(context: &str, e: JsValue) -> Error {
    Error::HostError(format!("{}: {:?}", context, e))
}

fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| Error::HostError("no global window".into()))
}

type ObserverCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

struct PendingFrame {
    raf_id: i32,
    fired: Rc<Cell<bool>>,
    _closure: Closure<dyn FnMut(f64)>,
}

pub struct WebHost {
    window: Window,
    region: HtmlElement,
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<u64, (HostEvent, Closure<dyn Fn()>)>>,
    observers: RefCell<HashMap<u64, (IntersectionObserver, ObserverCallback)>>,
    frames: RefCell<HashMap<u64, PendingFrame>>,
}

impl WebHost {
    pub fn new(region: HtmlElement) -> Result<Self> {
        Ok(WebHost {
            window: window()?,
            region,
            next_id: Cell::new(1),
            listeners: RefCell::new(HashMap::new()),
            observers: RefCell::new(HashMap::new()),
            frames: RefCell::new(HashMap::new()),
        })
    }

    pub fn from_element_id(id: &str) -> Result<Self> {
        let document = window()?
            .document()
            .ok_or_else(|| Error::HostError("no document".into()))?;
        let region = document
            .get_element_by_id(id)
            .ok_or_else(|| Error::HostError(format!("no element with id '{}'", id)))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| Error::HostError(format!("element '{}' is not an HTML element", id)))?;
        WebHost::new(region)
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn document_element(&self) -> Option<web_sys::Element> {
        self.window.document().and_then(|d| d.document_element())
    }
}

impl HostEnvironment for WebHost {
    fn scroll_offset(&self) -> f64 {
        match self.window.scroll_y() {
            Ok(y) if y.is_finite() => y,
            _ => self
                .document_element()
                .map(|e| e.scroll_top() as f64)
                .unwrap_or(0.0),
        }
    }

    fn viewport(&self) -> Viewport {
        let read = |v: std::result::Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64());
        let fallback = self.document_element();
        let width = read(self.window.inner_width())
            .or_else(|| fallback.as_ref().map(|e| e.client_width() as f64))
            .unwrap_or(0.0);
        let height = read(self.window.inner_height())
            .or_else(|| fallback.as_ref().map(|e| e.client_height() as f64))
            .unwrap_or(0.0);
        Viewport { width, height }
    }

    fn region_anchor(&self) -> Option<LayoutAnchor> {
        if !self.region.is_connected() {
            return None;
        }
        Some(LayoutAnchor {
            top: self.region.offset_top() as f64,
            height: self.region.offset_height() as f64,
        })
    }

    fn region_rect(&self) -> Option<Rect> {
        if !self.region.is_connected() {
            return None;
        }
        let r = self.region.get_bounding_client_rect();
        Some(Rect {
            x: r.x(),
            y: r.y(),
            width: r.width(),
            height: r.height(),
        })
    }

    fn add_listener(&self, event: HostEvent, handler: EventHandler) -> Result<ListenerId> {
        let closure = Closure::<dyn Fn()>::new(move || handler());
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        self.window
            .add_event_listener_with_callback_and_add_event_listener_options(
                event.as_str(),
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| js_err("addEventListener", e))?;
        let id = self.next_id();
        self.listeners.borrow_mut().insert(id, (event, closure));
        Ok(ListenerId(id))
    }

    fn remove_listener(&self, id: ListenerId) {
        if let Some((event, closure)) = self.listeners.borrow_mut().remove(&id.0) {
            if let Err(e) = self
                .window
                .remove_event_listener_with_callback(event.as_str(), closure.as_ref().unchecked_ref())
            {
                warn!("removeEventListener({}) failed: {:?}", event.as_str(), e);
            }
        }
    }

    fn observe_region(&self, thresholds: &[f64], handler: IntersectionHandler) -> Result<ObserverId> {
        let callback: ObserverCallback = Closure::new(move |entries: Array, _observer: IntersectionObserver| {
            let entries: Vec<IntersectionEntry> = entries
                .iter()
                .filter_map(|v| v.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|e| IntersectionEntry {
                    is_intersecting: e.is_intersecting(),
                    intersection_ratio: e.intersection_ratio(),
                })
                .collect();
            handler(&entries);
        });

        let threshold_list: Array = thresholds.iter().map(|t| JsValue::from_f64(*t)).collect();
        let init = IntersectionObserverInit::new();
        init.set_threshold(&threshold_list);
        init.set_root_margin("0px");

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                .map_err(|e| js_err("IntersectionObserver", e))?;
        observer.observe(&self.region);

        let id = self.next_id();
        self.observers.borrow_mut().insert(id, (observer, callback));
        Ok(ObserverId(id))
    }

    fn disconnect_observer(&self, id: ObserverId) {
        if let Some((observer, _callback)) = self.observers.borrow_mut().remove(&id.0) {
            observer.disconnect();
        }
    }

    fn request_frame(&self, cb: FrameCallback) -> Result<FrameHandle> {
        // Frames that already ran can drop their closures now.
        self.frames.borrow_mut().retain(|_, f| !f.fired.get());

        let fired = Rc::new(Cell::new(false));
        let slot = RefCell::new(Some(cb));
        let fired_in_cb = Rc::clone(&fired);
        let closure = Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
            if let Some(cb) = slot.borrow_mut().take() {
                cb(timestamp);
            }
            fired_in_cb.set(true);
        });
        let raf_id = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|e| js_err("requestAnimationFrame", e))?;

        let id = self.next_id();
        self.frames.borrow_mut().insert(
            id,
            PendingFrame {
                raf_id,
                fired,
                _closure: closure,
            },
        );
        Ok(FrameHandle(id))
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Some(frame) = self.frames.borrow_mut().remove(&handle.0) {
            if !frame.fired.get() {
                if let Err(e) = self.window.cancel_animation_frame(frame.raf_id) {
                    warn!("cancelAnimationFrame failed: {:?}", e);
                }
            }
        }
    }
}

/// Map the outcome of a `currentTime` assignment onto the controller's
/// error type. `Ok(false)` means the property refused the value.
fn seek_result<E: std::fmt::Debug>(time: f64, assigned: std::result::Result<bool, E>) -> Result<()> {
    match assigned {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::SeekRejected {
            time,
            reason: "currentTime assignment was refused".into(),
        }),
        Err(e) => Err(Error::SeekRejected {
            time,
            reason: format!("{:?}", e),
        }),
    }
}

pub struct WebMedia {
    video: HtmlVideoElement,
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<u64, Closure<dyn Fn()>>>,
}

impl WebMedia {
    pub fn new(video: HtmlVideoElement) -> Self {
        WebMedia {
            video,
            next_id: Cell::new(1),
            listeners: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_element_id(id: &str) -> Result<Self> {
        let document = window()?
            .document()
            .ok_or_else(|| Error::HostError("no document".into()))?;
        let video = document
            .get_element_by_id(id)
            .ok_or_else(|| Error::HostError(format!("no element with id '{}'", id)))?
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| Error::HostError(format!("element '{}' is not a video", id)))?;
        Ok(WebMedia::new(video))
    }
}

impl MediaSurface for WebMedia {
    fn is_attached(&self) -> bool {
        self.video.is_connected()
    }

    fn duration(&self) -> f64 {
        self.video.duration()
    }

    fn current_time(&self) -> f64 {
        self.video.current_time()
    }

    fn set_current_time(&self, seconds: f64) -> Result<()> {
        // The setter throws a TypeError for non-finite values.
        if !seconds.is_finite() {
            return Err(Error::SeekRejected {
                time: seconds,
                reason: "position must be finite".into(),
            });
        }
        // The generated setter does not catch; a throwing assignment would
        // unwind through the frame callback and end the frame loop.
        let assigned = js_sys::Reflect::set(
            self.video.as_ref(),
            &JsValue::from_str("currentTime"),
            &JsValue::from_f64(seconds),
        );
        seek_result(seconds, assigned)
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_code(self.video.ready_state())
    }

    fn seeking(&self) -> bool {
        self.video.seeking()
    }

    fn configure_inline_playback(&self) {
        self.video.set_muted(true);
        self.video.set_autoplay(false);
        self.video.set_preload("auto");
        for (name, value) in INLINE_PLAYBACK_ATTRIBUTES {
            if let Err(e) = self.video.set_attribute(name, value) {
                warn!("could not set video attribute {}: {:?}", name, e);
            }
        }
    }

    fn on_metadata_loaded(&self, handler: EventHandler) -> Result<ListenerId> {
        let closure = Closure::<dyn Fn()>::new(move || handler());
        self.video
            .add_event_listener_with_callback("loadedmetadata", closure.as_ref().unchecked_ref())
            .map_err(|e| js_err("addEventListener(loadedmetadata)", e))?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, closure);
        Ok(ListenerId(id))
    }

    fn remove_listener(&self, id: ListenerId) {
        if let Some(closure) = self.listeners.borrow_mut().remove(&id.0) {
            if let Err(e) = self
                .video
                .remove_event_listener_with_callback("loadedmetadata", closure.as_ref().unchecked_ref())
            {
                warn!("removeEventListener(loadedmetadata) failed: {:?}", e);
            }
        }
    }
}

/// Mount a controller on the region and video found by element id.
pub fn mount_by_id(region_id: &str, video_id: &str, config: &ControllerConfig) -> Result<ScrollVideoController> {
    config.validate()?;
    let host = WebHost::from_element_id(region_id)?;
    let media = WebMedia::from_element_id(video_id)?;
    Ok(ScrollVideoController::mount(host, media, config))
}
