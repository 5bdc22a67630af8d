//! Controller configuration
//!
//! [`ControllerConfig`] carries the construction parameters of a scroll video
//! controller. It can be built in code (`ControllerConfig::new` plus struct
//! update syntax) or deserialized from JSON:
//!
//! ```
//! let cfg = scrollscrub::ControllerConfig::from_json(
//!     r#"{ "source": "https://example.com/story.webm", "scroll_length": "300vh" }"#,
//! ).unwrap();
//! assert_eq!(cfg.scroll_length.to_string(), "300vh");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::progress::ProgressStrategy;
use crate::smoothing::SmoothingParams;
use crate::{Error, Result, Viewport};

/// Scroll distance that maps onto the full media duration (the host region's
/// CSS height)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScrollLength {
    /// Multiple of the viewport height, in `vh` units (`400vh` is four screens)
    ViewportHeights(f64),
    /// Absolute CSS pixels
    Pixels(f64),
}

impl Default for ScrollLength {
    fn default() -> Self {
        ScrollLength::ViewportHeights(400.0)
    }
}

impl ScrollLength {
    /// Region height in CSS pixels for the given viewport.
    pub fn resolve(&self, viewport: Viewport) -> f64 {
        match *self {
            ScrollLength::ViewportHeights(vh) => vh / 100.0 * viewport.height,
            ScrollLength::Pixels(px) => px,
        }
    }
}

impl FromStr for ScrollLength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parse_number = |n: &str| -> Result<f64> {
            match n.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                _ => Err(Error::InvalidScrollLength(s.to_string())),
            }
        };
        if let Some(n) = trimmed.strip_suffix("vh") {
            Ok(ScrollLength::ViewportHeights(parse_number(n)?))
        } else if let Some(n) = trimmed.strip_suffix("px") {
            Ok(ScrollLength::Pixels(parse_number(n)?))
        } else {
            Err(Error::InvalidScrollLength(s.to_string()))
        }
    }
}

impl fmt::Display for ScrollLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollLength::ViewportHeights(v) => write!(f, "{}vh", v),
            ScrollLength::Pixels(v) => write!(f, "{}px", v),
        }
    }
}

impl TryFrom<String> for ScrollLength {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ScrollLength> for String {
    fn from(s: ScrollLength) -> Self {
        s.to_string()
    }
}

/// Where the video comes from
///
/// The asset itself is fetched by the host's ordinary resource loading; this
/// type only validates the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaSource {
    /// Absolute URL (`https:`, `blob:`, `data:`, `file:` ...)
    Remote(Url),
    /// Path relative to the page, e.g. `assets/story.mp4`
    Local(String),
}

impl MediaSource {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidSource("source is empty".into()));
        }
        match Url::parse(trimmed) {
            Ok(url) => Ok(MediaSource::Remote(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                if trimmed.chars().any(char::is_whitespace) {
                    return Err(Error::InvalidSource(format!(
                        "relative source '{}' contains whitespace",
                        trimmed
                    )));
                }
                Ok(MediaSource::Local(trimmed.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaSource::Remote(url) => url.as_str(),
            MediaSource::Local(path) => path,
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MediaSource {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        MediaSource::parse(&s)
    }
}

impl From<MediaSource> for String {
    fn from(s: MediaSource) -> Self {
        s.as_str().to_string()
    }
}

fn default_loading_label() -> String {
    "Loading story...".to_string()
}

/// Construction parameters for a scroll video controller
///
/// `source` is required; every other field has a default so that
/// `ControllerConfig::new(src)` gives a `400vh` region with the stock
/// smoothing calibration and live-rect measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Media URL or page-relative resource path
    pub source: MediaSource,
    /// Scroll distance mapped onto the full media duration
    #[serde(default)]
    pub scroll_length: ScrollLength,
    /// Opaque HTML fragment rendered above the video, never interactive
    #[serde(default)]
    pub overlay: Option<String>,
    /// Per-frame smoothing calibration
    #[serde(default)]
    pub smoothing: SmoothingParams,
    /// How the host region is measured on each sample
    #[serde(default)]
    pub strategy: ProgressStrategy,
    /// Text shown next to the loading indicator
    #[serde(default = "default_loading_label")]
    pub loading_label: String,
}

impl ControllerConfig {
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self {
            source: MediaSource::parse(source)?,
            scroll_length: ScrollLength::default(),
            overlay: None,
            smoothing: SmoothingParams::default(),
            strategy: ProgressStrategy::default(),
            loading_label: default_loading_label(),
        })
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: ControllerConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        let zero = match self.scroll_length {
            ScrollLength::ViewportHeights(v) | ScrollLength::Pixels(v) => v <= 0.0,
        };
        if zero {
            return Err(Error::ConfigError(format!(
                "scroll_length must be positive, got {}",
                self.scroll_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_lengths() {
        assert_eq!("400vh".parse::<ScrollLength>().unwrap(), ScrollLength::ViewportHeights(400.0));
        assert_eq!(" 4000px ".parse::<ScrollLength>().unwrap(), ScrollLength::Pixels(4000.0));
        assert_eq!("250.5vh".parse::<ScrollLength>().unwrap(), ScrollLength::ViewportHeights(250.5));
    }

    #[test]
    fn rejects_bad_lengths() {
        for bad in ["", "400", "400em", "-3vh", "vh", "NaNpx", "infpx"] {
            assert!(bad.parse::<ScrollLength>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn resolves_against_viewport() {
        let v = Viewport { width: 1280.0, height: 800.0 };
        assert_eq!(ScrollLength::default().resolve(v), 3200.0);
        assert_eq!(ScrollLength::Pixels(1234.0).resolve(v), 1234.0);
    }

    #[test]
    fn media_source_kinds() {
        match MediaSource::parse("https://cdn.example.com/v.webm").unwrap() {
            MediaSource::Remote(u) => assert_eq!(u.host_str(), Some("cdn.example.com")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            MediaSource::parse("media/story.mp4").unwrap(),
            MediaSource::Local("media/story.mp4".into())
        );
        assert!(MediaSource::parse("   ").is_err());
        assert!(MediaSource::parse("my video.mp4").is_err());
        assert!(MediaSource::parse("http://[::1").is_err());
    }

    #[test]
    fn json_defaults() {
        let cfg = ControllerConfig::from_json(r#"{ "source": "clip.webm" }"#).unwrap();
        assert_eq!(cfg.scroll_length, ScrollLength::ViewportHeights(400.0));
        assert_eq!(cfg.strategy, ProgressStrategy::LiveRect);
        assert_eq!(cfg.smoothing, SmoothingParams::default());
        assert!(cfg.overlay.is_none());
        assert_eq!(cfg.loading_label, "Loading story...");
    }

    #[test]
    fn json_overrides() {
        let cfg = ControllerConfig::from_json(
            r#"{
                "source": "https://example.com/a.webm",
                "scroll_length": "4000px",
                "strategy": "cached-anchor",
                "smoothing": { "easing": 0.15, "write_threshold": 0.01 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.scroll_length, ScrollLength::Pixels(4000.0));
        assert_eq!(cfg.strategy, ProgressStrategy::CachedAnchor);
        assert_eq!(cfg.smoothing.easing, 0.15);
        assert_eq!(cfg.smoothing.progress_epsilon, 1e-4);
    }

    #[test]
    fn json_rejects_missing_source_and_bad_values() {
        assert!(ControllerConfig::from_json("{}").is_err());
        assert!(ControllerConfig::from_json(r#"{ "source": "a.mp4", "scroll_length": "0vh" }"#).is_err());
        assert!(ControllerConfig::from_json(r#"{ "source": "a.mp4", "smoothing": { "easing": 2.0 } }"#).is_err());
    }

    #[test]
    fn serializes_lengths_as_css() {
        let cfg = ControllerConfig::new("a.mp4").unwrap();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["scroll_length"], "400vh");
        assert_eq!(json["source"], "a.mp4");
    }
}
