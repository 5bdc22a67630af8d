//! Platform API surface: host environment and media surface capabilities
//!
//! The controller never touches a real document or video element directly.
//! It talks to these two traits, which the browser backend (`web` feature),
//! the deterministic [`sim`] backend and the inert [`NoopHost`] /
//! [`NoopMedia`] providers implement.
//!
//! Everything here is single-threaded: handlers are `Rc` closures and
//! implementations use interior mutability, matching a host that runs all
//! callbacks on one UI thread.

pub mod host;
pub mod media;
pub mod sim;

pub use host::{
    EventHandler, FrameCallback, FrameHandle, HostEnvironment, HostEvent, IntersectionEntry,
    IntersectionHandler, ListenerId, NoopHost, ObserverId,
};
pub use media::{MediaSurface, NoopMedia, ReadyState, INLINE_PLAYBACK_ATTRIBUTES};

/// Intersection thresholds the controller observes the host region with:
/// eleven evenly spaced points from 0 to 1, so partial visibility changes on
/// short mobile viewports still produce callbacks.
pub fn visibility_thresholds() -> Vec<f64> {
    (0..=10).map(|i| i as f64 / 10.0).collect()
}
