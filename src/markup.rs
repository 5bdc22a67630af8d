//! Static HTML for the scroll video component
//!
//! The structure the controller expects to find in the document:
//!
//! - a host region whose height is the configured scroll length;
//! - a sticky, viewport-sized wrapper holding the loading indicator and the
//!   full-bleed `<video>`;
//! - an overlay layer spanning the whole region above the video with
//!   `pointer-events: none`, so it never swallows scroll or touch gestures.

use std::fmt::Write;

use crate::config::ControllerConfig;
use crate::platform::INLINE_PLAYBACK_ATTRIBUTES;

/// Class of the host region; inner elements use `__` suffixes of it
pub const REGION_CLASS: &str = "scroll-video";

/// Escape text for use inside HTML text nodes and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the component. `loading` controls whether the loading indicator is
/// present; `id` becomes the region's id and prefixes the video's id.
pub fn render_component(config: &ControllerConfig, id: &str, loading: bool) -> String {
    let id = escape_html(id);
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<div id="{id}" class="{cls}" style="position:relative;width:100%;height:{len}">"#,
        id = id,
        cls = REGION_CLASS,
        len = config.scroll_length,
    );
    let _ = write!(
        html,
        r#"<div class="{cls}__sticky" style="position:sticky;top:0;left:0;width:100%;height:100vh;overflow:hidden">"#,
        cls = REGION_CLASS,
    );
    if loading {
        html.push_str(&render_loading_indicator(&config.loading_label));
    }
    let _ = write!(
        html,
        r#"<video id="{id}-video" class="{cls}__media" src="{src}" style="position:absolute;inset:0;width:100%;height:100%;object-fit:cover""#,
        id = id,
        cls = REGION_CLASS,
        src = escape_html(config.source.as_str()),
    );
    for (name, value) in INLINE_PLAYBACK_ATTRIBUTES {
        if value.is_empty() {
            let _ = write!(html, " {}", name);
        } else {
            let _ = write!(html, r#" {}="{}""#, name, escape_html(value));
        }
    }
    html.push_str("></video></div>");

    let _ = write!(
        html,
        r#"<div class="{cls}__overlay" style="position:absolute;top:0;left:0;width:100%;height:100%;z-index:10;pointer-events:none">"#,
        cls = REGION_CLASS,
    );
    if let Some(overlay) = &config.overlay {
        // Caller-supplied fragment, inserted as-is.
        html.push_str(overlay);
    }
    html.push_str("</div></div>");
    html
}

/// The spinner plus label shown until metadata arrives
pub fn render_loading_indicator(label: &str) -> String {
    format!(
        r#"<div class="{cls}__loading" role="status" aria-live="polite" style="position:absolute;inset:0;z-index:20;display:flex;align-items:center;justify-content:center"><span class="{cls}__spinner" aria-hidden="true"></span><span class="{cls}__label">{label}</span></div>"#,
        cls = REGION_CLASS,
        label = escape_html(label),
    )
}
