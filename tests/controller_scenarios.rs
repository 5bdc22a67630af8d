//! End-to-end behaviour of the controller against the simulated host

use std::cell::Cell;
use std::rc::Rc;

use scrollscrub::controller::ScrollVideoController;
use scrollscrub::platform::sim::{SimulatedHost, SimulatedMedia};
use scrollscrub::platform::{MediaSurface, ReadyState};
use scrollscrub::{ControllerConfig, ProgressStrategy, ScrollLength, SmoothingParams, Viewport};

const FRAME_MS: f64 = 1000.0 / 60.0;

fn viewport() -> Viewport {
    Viewport { width: 1280.0, height: 800.0 }
}

fn config() -> ControllerConfig {
    ControllerConfig::new("https://example.com/story.webm").expect("valid config")
}

/// A `400vh` region at the top of the document (3200px tall, 2400px of slack).
fn mount(cfg: &ControllerConfig) -> (SimulatedHost, SimulatedMedia, ScrollVideoController) {
    let host = SimulatedHost::new(viewport(), 0.0, cfg.scroll_length.resolve(viewport()));
    let media = SimulatedMedia::new();
    let controller = ScrollVideoController::mount(host.clone(), media.clone(), cfg);
    (host, media, controller)
}

#[test]
fn scenario_a_half_scroll_converges_to_half_duration() {
    let cfg = ControllerConfig {
        scroll_length: ScrollLength::ViewportHeights(400.0),
        ..config()
    };
    let (host, media, controller) = mount(&cfg);
    media.load_metadata(10.0);

    host.scroll_to(host.offset_for_progress(0.5));
    assert_eq!(controller.target_time(), 5.0);

    host.run_frames(120, FRAME_MS);
    assert!((media.current_time() - 5.0).abs() <= cfg.smoothing.write_threshold);
    assert_eq!(controller.target_time(), 5.0);
}

#[test]
fn scenario_b_unknown_duration_leaves_target_unset() {
    let (host, media, controller) = mount(&config());
    host.scroll_to(host.offset_for_progress(1.0));
    host.run_frames(30, FRAME_MS);

    assert_eq!(controller.target_time(), 0.0);
    assert_eq!(controller.last_progress(), None);
    assert!(controller.is_loading());
    assert_eq!(media.write_count(), 0);
    assert_eq!(controller.stats().target_updates, 0);
}

#[test]
fn scenario_c_region_shorter_than_viewport_stays_at_zero() {
    let cfg = ControllerConfig {
        scroll_length: ScrollLength::Pixels(600.0),
        ..config()
    };
    let (host, media, controller) = mount(&cfg);
    host.set_trailing_height(5000.0);
    media.load_metadata(10.0);

    for y in [0.0, 100.0, 599.0, 2000.0, 4000.0] {
        host.scroll_to(y);
        host.run_frames(5, FRAME_MS);
        assert_eq!(controller.current_progress(), Some(0.0));
        assert_eq!(controller.target_time(), 0.0);
    }
    assert_eq!(media.current_time(), 0.0);
    assert_eq!(media.write_count(), 0);
}

#[test]
fn scenario_d_repeated_events_at_same_position_update_once() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);

    let y = host.offset_for_progress(0.3);
    for _ in 0..50 {
        host.scroll_to(y);
    }
    assert_eq!(controller.stats().target_updates, 1);

    // Sub-epsilon movement: 0.1px of 2400px is below 1e-4 progress.
    host.scroll_to(y + 0.1);
    host.run_frames(3, FRAME_MS);
    assert_eq!(controller.stats().target_updates, 1);

    host.scroll_to(host.offset_for_progress(0.6));
    host.scroll_to(host.offset_for_progress(0.6));
    assert_eq!(controller.stats().target_updates, 2);
}

#[test]
fn convergence_is_strictly_monotone_without_overshoot() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(20.0);
    host.scroll_to(host.offset_for_progress(0.75));
    let target = controller.target_time();
    assert_eq!(target, 15.0);

    let threshold = SmoothingParams::default().write_threshold;
    let mut gap = (target - media.current_time()).abs();
    let mut frames = 0;
    while gap > threshold {
        host.advance_frame(FRAME_MS);
        let now = media.current_time();
        assert!(now <= target, "overshot: {} > {}", now, target);
        let new_gap = (target - now).abs();
        assert!(new_gap < gap);
        gap = new_gap;
        frames += 1;
        assert!(frames < 200, "did not converge");
    }

    // Once inside the threshold nothing else is written.
    let writes = media.write_count();
    host.run_frames(10, FRAME_MS);
    assert_eq!(media.write_count(), writes);
}

#[test]
fn scrubbing_backwards_converges_from_above() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);
    host.scroll_to(host.offset_for_progress(1.0));
    host.run_frames(120, FRAME_MS);
    assert!((media.current_time() - 10.0).abs() <= 0.005);

    host.scroll_to(host.offset_for_progress(0.2));
    assert_eq!(controller.target_time(), 2.0);
    host.run_frames(120, FRAME_MS);
    assert!((media.current_time() - 2.0).abs() <= 0.005);
    assert!(media.writes().iter().all(|t| *t >= 2.0 - 0.005));
}

#[test]
fn seeking_blocks_every_write() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);
    host.scroll_to(host.offset_for_progress(1.0));

    media.set_seeking(true);
    host.run_frames(30, FRAME_MS);
    assert_eq!(media.write_count(), 0);
    assert_eq!(controller.stats().seek_skips, 30);

    media.set_seeking(false);
    host.advance_frame(FRAME_MS);
    assert_eq!(media.write_count(), 1);
}

#[test]
fn seek_latency_spaces_out_writes() {
    let (host, media, _controller) = mount(&config());
    media.load_metadata(10.0);
    media.set_seek_latency(3);
    host.scroll_to(host.offset_for_progress(1.0));

    for _ in 0..12 {
        host.advance_frame(FRAME_MS);
        media.decode_tick();
    }
    // A write holds the surface for the next two frames.
    assert_eq!(media.write_count(), 4);
    assert!(media.writes().windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn rejected_writes_are_logged_and_the_loop_keeps_running() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);
    host.scroll_to(host.offset_for_progress(0.5));

    media.set_reject_writes(true);
    host.run_frames(10, FRAME_MS);
    assert_eq!(controller.stats().rejected_writes, 10);
    assert_eq!(host.pending_frames(), 1);
    assert_eq!(media.current_time(), 0.0);

    media.set_reject_writes(false);
    host.run_frames(120, FRAME_MS);
    assert!((media.current_time() - 5.0).abs() <= 0.005);
}

#[test]
fn readiness_gate_defers_all_work() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);
    media.set_ready_state(ReadyState::HaveMetadata);
    host.scroll_silently(host.offset_for_progress(0.5));

    host.run_frames(10, FRAME_MS);
    let stats = controller.stats();
    assert_eq!(stats.unready_ticks, 10);
    assert_eq!(stats.position_writes, 0);
    assert_eq!(controller.target_time(), 0.0);
    assert_eq!(host.pending_frames(), 1);

    media.set_ready_state(ReadyState::HaveCurrentData);
    host.advance_frame(FRAME_MS);
    assert_eq!(controller.target_time(), 5.0);
    assert_eq!(media.write_count(), 1);
}

#[test]
fn frame_loop_catches_scrolls_that_fired_no_event() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);

    host.scroll_silently(host.offset_for_progress(0.4));
    assert_eq!(controller.target_time(), 0.0);

    host.advance_frame(FRAME_MS);
    assert_eq!(controller.target_time(), 4.0);
}

#[test]
fn touch_events_retarget_immediately() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);

    host.touch_move(host.offset_for_progress(0.25));
    assert_eq!(controller.target_time(), 2.5);

    host.scroll_silently(host.offset_for_progress(0.5));
    host.touch_end();
    assert_eq!(controller.target_time(), 5.0);
    assert_eq!(host.counts().scroll, 0);
}

#[test]
fn intersection_entering_view_retargets() {
    let vp = viewport();
    let host = SimulatedHost::new(vp, 1000.0, 3200.0);
    let media = SimulatedMedia::new();
    media.load_metadata(10.0);
    let controller = ScrollVideoController::mount(host.clone(), media.clone(), &config());

    let before = controller.stats().event_samples;
    host.resize(Viewport { width: 1280.0, height: 1100.0 });
    assert!(controller.stats().event_samples > before);
}

#[test]
fn intersection_reports_only_sample_while_intersecting() {
    // Region starts 200px below the fold.
    let host = SimulatedHost::new(viewport(), 1000.0, 3200.0);
    let media = SimulatedMedia::new();
    media.load_metadata(10.0);
    let controller = ScrollVideoController::mount(host.clone(), media.clone(), &config());

    // The observer's initial report is non-intersecting; only the mount
    // sample is counted.
    assert_eq!(host.counts().intersection, 1);
    assert_eq!(controller.stats().event_samples, 1);
    assert_eq!(controller.target_time(), 0.0);

    // Move without any event, then let a resize bring the region into view.
    host.scroll_silently(1500.0);
    assert_eq!(controller.target_time(), 0.0);
    host.resize(Viewport { width: 1280.0, height: 810.0 });

    assert_eq!(host.counts().intersection, 2);
    assert_eq!(controller.stats().event_samples, 2);
    let expected = 10.0 * 500.0 / (3200.0 - 810.0);
    assert!((controller.target_time() - expected).abs() < 1e-9);
}

#[test]
fn progress_recomputation_is_idempotent() {
    let (host, media, controller) = mount(&config());
    media.load_metadata(10.0);
    host.scroll_to(host.offset_for_progress(0.35));

    let stats = controller.stats();
    let target = controller.target_time();
    let first = controller.current_progress();
    let second = controller.current_progress();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(controller.stats(), stats);
    assert_eq!(controller.target_time(), target);

    let cached = ControllerConfig {
        strategy: ProgressStrategy::CachedAnchor,
        ..config()
    };
    let (host, _media, controller) = mount(&cached);
    host.scroll_silently(host.offset_for_progress(0.8));
    assert_eq!(controller.current_progress(), controller.current_progress());
}

#[test]
fn loading_gate_flips_once_and_notifies() {
    let (_host, media, controller) = mount(&config());
    let renders = Rc::new(Cell::new(0));
    let r = Rc::clone(&renders);
    controller.on_ready(move || r.set(r.get() + 1));

    assert!(controller.is_loading());
    media.load_metadata(10.0);
    assert!(!controller.is_loading());
    media.load_metadata(12.0);
    assert!(!controller.is_loading());
    assert_eq!(renders.get(), 1);
}

#[test]
fn teardown_silences_every_callback() {
    let (host, media, mut controller) = mount(&config());
    media.load_metadata(10.0);
    host.scroll_to(host.offset_for_progress(0.5));
    host.run_frames(5, FRAME_MS);

    controller.unmount();
    let stats = controller.stats();
    let dispatched = host.counts();
    let target = controller.target_time();
    let writes = media.write_count();

    assert_eq!(host.listener_count(), 0);
    assert_eq!(host.observer_count(), 0);
    assert_eq!(host.pending_frames(), 0);
    assert_eq!(media.metadata_listener_count(), 0);

    host.scroll_to(host.offset_for_progress(0.9));
    host.touch_move(host.offset_for_progress(0.1));
    host.touch_end();
    host.resize(Viewport { width: 800.0, height: 600.0 });
    host.run_frames(30, FRAME_MS);
    media.load_metadata(11.0);

    assert_eq!(host.counts().scroll, dispatched.scroll);
    assert_eq!(host.counts().touch_move, dispatched.touch_move);
    assert_eq!(host.counts().touch_end, dispatched.touch_end);
    assert_eq!(host.counts().intersection, dispatched.intersection);
    assert_eq!(host.counts().frames, dispatched.frames);
    assert_eq!(controller.stats(), stats);
    assert_eq!(controller.target_time(), target);
    assert_eq!(media.write_count(), writes);
}

#[test]
fn remounting_does_not_accumulate_subscriptions() {
    let host = SimulatedHost::new(viewport(), 0.0, 3200.0);
    let media = SimulatedMedia::new();
    for _ in 0..5 {
        let c = ScrollVideoController::mount(host.clone(), media.clone(), &config());
        assert_eq!(host.listener_count(), 3);
        assert_eq!(host.observer_count(), 1);
        assert_eq!(host.pending_frames(), 1);
        drop(c);
    }
    assert_eq!(host.listener_count(), 0);
    assert_eq!(host.pending_frames(), 0);
    assert_eq!(media.metadata_listener_count(), 0);
}

#[test]
fn detached_region_or_media_mounts_inert() {
    let host = SimulatedHost::detached(viewport());
    let media = SimulatedMedia::new();
    let c = ScrollVideoController::mount(host.clone(), media.clone(), &config());
    assert!(!c.is_active());
    assert_eq!(host.listener_count(), 0);
    assert_eq!(host.pending_frames(), 0);
    assert_eq!(media.metadata_listener_count(), 0);

    let host = SimulatedHost::new(viewport(), 0.0, 3200.0);
    let media = SimulatedMedia::detached();
    let c = ScrollVideoController::mount(host.clone(), media.clone(), &config());
    assert!(!c.is_active());
    assert_eq!(host.listener_count(), 0);
    assert_eq!(host.observer_count(), 0);
    assert!(media.attribute("playsinline").is_none());
}

#[test]
fn instances_are_independent() {
    let host_a = SimulatedHost::new(viewport(), 0.0, 3200.0);
    let host_b = SimulatedHost::new(viewport(), 0.0, 3200.0);
    let media_a = SimulatedMedia::new();
    let media_b = SimulatedMedia::new();
    media_a.load_metadata(10.0);
    media_b.load_metadata(10.0);
    let a = ScrollVideoController::mount(host_a.clone(), media_a.clone(), &config());
    let b = ScrollVideoController::mount(host_b.clone(), media_b.clone(), &config());

    host_a.scroll_to(host_a.offset_for_progress(1.0));
    host_a.run_frames(10, FRAME_MS);
    host_b.run_frames(10, FRAME_MS);

    assert_eq!(a.target_time(), 10.0);
    assert_eq!(b.target_time(), 0.0);
    assert_eq!(media_b.write_count(), 0);
}

#[test]
fn strategies_agree_on_static_layout_and_diverge_after_reflow() {
    let live_cfg = config();
    let cached_cfg = ControllerConfig {
        strategy: ProgressStrategy::CachedAnchor,
        ..config()
    };

    let host = SimulatedHost::new(viewport(), 400.0, 3200.0);
    host.set_trailing_height(2000.0);
    let media_live = SimulatedMedia::new();
    let media_cached = SimulatedMedia::new();
    media_live.load_metadata(10.0);
    media_cached.load_metadata(10.0);
    let live = ScrollVideoController::mount(host.clone(), media_live.clone(), &live_cfg);
    let cached = ScrollVideoController::mount(host.clone(), media_cached.clone(), &cached_cfg);

    host.scroll_to(host.offset_for_progress(0.5));
    assert_eq!(live.current_progress(), Some(0.5));
    assert_eq!(cached.current_progress(), Some(0.5));

    // 600px of content appears above the region without a scroll event.
    host.shift_layout(600.0);
    assert_eq!(live.current_progress(), Some(0.25));
    assert_eq!(cached.current_progress(), Some(0.5));

    host.advance_frame(FRAME_MS);
    assert_eq!(live.target_time(), 2.5);
    assert_eq!(cached.target_time(), 5.0);
}

#[test]
fn inline_playback_is_configured_on_mount() {
    let (_host, media, _controller) = mount(&config());
    assert_eq!(media.attribute("muted").as_deref(), Some(""));
    assert_eq!(media.attribute("playsinline").as_deref(), Some(""));
    assert_eq!(media.attribute("webkit-playsinline").as_deref(), Some("true"));
    assert_eq!(media.attribute("x5-playsinline").as_deref(), Some("true"));
    assert!(media.attribute("autoplay").is_none());
    assert!(media.duration().is_nan());
}
