/// Media surface capability: a seekable video element whose position the
/// controller drives.

use crate::platform::host::{EventHandler, ListenerId};
use crate::Result;

/// Attributes that make a video silent, inline and autoplay-eligible without
/// autoplaying. The `webkit-` and `x5-` variants cover older iOS Safari and
/// Android WebViews that ignore plain `playsinline`.
pub const INLINE_PLAYBACK_ATTRIBUTES: &[(&str, &str)] = &[
    ("muted", ""),
    ("playsinline", ""),
    ("webkit-playsinline", "true"),
    ("x5-playsinline", "true"),
    ("preload", "auto"),
];

/// HTML media `readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }

    /// Whether a position assignment can take effect
    pub fn can_seek(&self) -> bool {
        *self >= ReadyState::HaveCurrentData
    }
}

pub trait MediaSurface {
    /// Whether the surface exists in the document
    fn is_attached(&self) -> bool;

    /// Duration in seconds; NaN until metadata has loaded
    fn duration(&self) -> f64;

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Assign the playback position. Hosts may reject some assignments.
    fn set_current_time(&self, seconds: f64) -> Result<()>;

    fn ready_state(&self) -> ReadyState;

    /// Whether a previous position assignment is still being resolved
    fn seeking(&self) -> bool;

    /// Make playback silent and inline with no autoplay; the controller is
    /// the only thing that moves the position.
    fn configure_inline_playback(&self);

    /// Subscribe to the "metadata loaded" notification.
    fn on_metadata_loaded(&self, handler: EventHandler) -> Result<ListenerId>;

    fn remove_listener(&self, id: ListenerId);
}

/// A surface that is not attached to anything
pub struct NoopMedia;

impl NoopMedia {
    pub fn new() -> Self {
        NoopMedia
    }
}

impl Default for NoopMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSurface for NoopMedia {
    fn is_attached(&self) -> bool {
        false
    }

    fn duration(&self) -> f64 {
        f64::NAN
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn set_current_time(&self, seconds: f64) -> Result<()> {
        Err(crate::Error::SeekRejected {
            time: seconds,
            reason: "no media attached".into(),
        })
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveNothing
    }

    fn seeking(&self) -> bool {
        false
    }

    fn configure_inline_playback(&self) {}

    fn on_metadata_loaded(&self, _handler: EventHandler) -> Result<ListenerId> {
        Ok(ListenerId(0))
    }

    fn remove_listener(&self, _id: ListenerId) {}
}
