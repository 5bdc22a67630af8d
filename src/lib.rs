//! scrollscrub
//!
//! A scroll-synced video playback controller for "scrollytelling" pages: as the
//! viewer scrolls through a tall host region, a pinned full-bleed video scrubs
//! forward and backward so its playback position tracks scroll progress.
//!
//! # Features
//!
//! - **Capability interfaces**: the controller only talks to a
//!   [`platform::HostEnvironment`] and a [`platform::MediaSurface`], so it runs
//!   unchanged against the browser (`web` feature) or the deterministic
//!   [`platform::sim`] host used by tests and the CLI
//! - **Two input paths**: passive scroll/touch/intersection events give an
//!   immediate update, a per-frame loop recomputes progress regardless
//! - **Seek-guarded smoothing**: position writes follow an exponential approach
//!   and are skipped while the surface is still resolving a previous seek
//!
//! # Example
//!
//! ```
//! use scrollscrub::controller::ScrollVideoController;
//! use scrollscrub::platform::sim::{SimulatedHost, SimulatedMedia};
//! use scrollscrub::platform::MediaSurface;
//! use scrollscrub::{ControllerConfig, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControllerConfig::new("https://example.com/story.webm")?;
//! let viewport = Viewport { width: 1280.0, height: 800.0 };
//! let host = SimulatedHost::new(viewport, 0.0, config.scroll_length.resolve(viewport));
//! let media = SimulatedMedia::new();
//!
//! let mut controller = ScrollVideoController::mount(host.clone(), media.clone(), &config);
//! media.load_metadata(10.0);
//! host.scroll_to(1200.0);
//! host.run_frames(120, 1000.0 / 60.0);
//! assert!((media.current_time() - 5.0).abs() < 0.01);
//! controller.unmount();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{ControllerConfig, MediaSource, ScrollLength};

pub mod progress;
pub use progress::ProgressStrategy;

pub mod smoothing;
pub use smoothing::SmoothingParams;

pub mod loading;

pub mod controller;
pub use controller::ScrollVideoController;

// Host and media capability traits plus the deterministic simulated backend
pub mod platform;

// Static HTML for the component (server-side or no-JS rendering)
pub mod markup;

// Real-time frame pacing for the simulated host
pub mod clock;

// Browser backend over web-sys
#[cfg(feature = "web")]
pub mod web;

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// A bounding rectangle relative to the viewport's top-left corner
///
/// `y` is negative once the element's top has scrolled above the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Document-relative layout of the host region (`offsetTop` / `offsetHeight`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutAnchor {
    pub top: f64,
    pub height: f64,
}
