use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::sync::oneshot;

use scrollscrub::clock::FrameClock;
use scrollscrub::controller::{ScrollVideoController, SessionStats};
use scrollscrub::markup::render_component;
use scrollscrub::platform::sim::{DispatchCounts, SimulatedHost, SimulatedMedia};
use scrollscrub::platform::{HostEnvironment, MediaSurface};
use scrollscrub::{ControllerConfig, ScrollLength, Viewport};

#[derive(Parser)]
#[command(name = "scrollscrub", version, about = "Scroll-synced video scrubbing: simulate sessions and render markup")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a deterministic scroll session against the simulated host and
    /// print a JSON trace
    Simulate(SimulateArgs),
    /// Print the component HTML for a configuration
    Markup(MarkupArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// JSON controller configuration; overrides --source/--scroll-length
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "story.webm")]
    source: String,
    /// e.g. 400vh or 4000px
    #[arg(long)]
    scroll_length: Option<String>,
    /// Media duration in seconds
    #[arg(long, default_value_t = 10.0)]
    duration: f64,
    #[arg(long, default_value_t = 1280.0)]
    viewport_width: f64,
    #[arg(long, default_value_t = 800.0)]
    viewport_height: f64,
    /// Document offset of the host region
    #[arg(long, default_value_t = 0.0)]
    region_top: f64,
    /// Scroll positions to visit, as fractions of the region's scrollable extent
    #[arg(long, value_delimiter = ',', default_value = "0.5")]
    progress: Vec<f64>,
    /// Frames to run after each scroll position
    #[arg(long, default_value_t = 60)]
    frames: u64,
    /// Frame at which metadata (and so the duration) becomes available
    #[arg(long, default_value_t = 0)]
    metadata_after: u64,
    /// Decoder ticks each accepted seek keeps the surface busy
    #[arg(long, default_value_t = 0)]
    seek_latency: u32,
    /// Make the surface refuse every position write
    #[arg(long)]
    reject_writes: bool,
    /// Drive scrolling with touchmove/touchend instead of scroll events
    #[arg(long)]
    touch: bool,
    /// Pace frames in real time instead of running them back to back
    #[arg(long)]
    realtime: bool,
    #[arg(long, default_value_t = 60.0)]
    fps: f64,
    /// Record every Nth frame
    #[arg(long, default_value_t = 1)]
    every: u64,
}

#[derive(Args)]
struct MarkupArgs {
    /// JSON controller configuration
    #[arg(long)]
    config: PathBuf,
    /// Id of the host region element
    #[arg(long, default_value = "scroll-video")]
    id: String,
    /// Render without the loading indicator
    #[arg(long)]
    ready: bool,
}

#[derive(Serialize)]
struct FrameSample {
    frame: u64,
    scroll_offset: f64,
    progress: Option<f64>,
    target_time: f64,
    current_time: f64,
    seeking: bool,
    loading: bool,
}

#[derive(Serialize)]
struct Report {
    config: ControllerConfig,
    viewport: Viewport,
    samples: Vec<FrameSample>,
    stats: SessionStats,
    dispatches: DispatchCounts,
}

struct Simulation {
    host: SimulatedHost,
    media: SimulatedMedia,
    controller: ScrollVideoController,
    duration: f64,
    metadata_after: u64,
    every: u64,
    frame: u64,
    samples: Vec<FrameSample>,
}

impl Simulation {
    fn after_frame(&mut self) {
        self.frame += 1;
        if self.frame == self.metadata_after {
            self.media.load_metadata(self.duration);
        }
        if self.frame % self.every == 0 {
            self.samples.push(FrameSample {
                frame: self.frame,
                scroll_offset: self.host.scroll_offset(),
                progress: self.controller.current_progress(),
                target_time: self.controller.target_time(),
                current_time: self.media.current_time(),
                seeking: self.media.seeking(),
                loading: self.controller.is_loading(),
            });
        }
    }

    fn move_to(&self, progress: f64, touch: bool) {
        let y = self.host.offset_for_progress(progress);
        if touch {
            self.host.touch_move(y);
            self.host.touch_end();
        } else {
            self.host.scroll_to(y);
        }
    }
}

fn load_config(path: &PathBuf) -> anyhow::Result<ControllerConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(ControllerConfig::from_json(&json)?)
}

fn simulate(args: SimulateArgs) -> anyhow::Result<()> {
    if args.every == 0 {
        bail!("--every must be at least 1");
    }
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut cfg = ControllerConfig::new(&args.source)?;
            if let Some(len) = &args.scroll_length {
                cfg.scroll_length = len.parse::<ScrollLength>()?;
            }
            cfg.validate()?;
            cfg
        }
    };

    let viewport = Viewport {
        width: args.viewport_width,
        height: args.viewport_height,
    };
    let host = SimulatedHost::new(viewport, args.region_top, config.scroll_length.resolve(viewport));
    let media = SimulatedMedia::new();
    media.set_seek_latency(args.seek_latency);
    media.set_reject_writes(args.reject_writes);

    let controller = ScrollVideoController::mount(host.clone(), media.clone(), &config);
    if args.metadata_after == 0 {
        media.load_metadata(args.duration);
    }

    let mut sim = Simulation {
        host: host.clone(),
        media: media.clone(),
        controller,
        duration: args.duration,
        metadata_after: args.metadata_after,
        every: args.every,
        frame: 0,
        samples: Vec::new(),
    };

    if args.realtime {
        let clock = FrameClock::new(args.fps)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let (stop_tx, mut stop_rx) = oneshot::channel();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        let _ = stop_tx.send(());
                    }
                    // No signal handler: never stop early.
                    Err(_) => std::future::pending::<()>().await,
                }
            });
            for &p in &args.progress {
                sim.move_to(p, args.touch);
                let (_step_tx, step_rx) = oneshot::channel();
                let ran = tokio::select! {
                    ran = clock.run(&host, Some(&media), args.frames, step_rx, |_| sim.after_frame()) => ran,
                    _ = &mut stop_rx => break,
                };
                log::debug!("ran {} frames at progress {}", ran, p);
            }
        });
    } else {
        let frame_ms = 1000.0 / args.fps.max(1.0);
        for &p in &args.progress {
            sim.move_to(p, args.touch);
            for _ in 0..args.frames {
                host.advance_frame(frame_ms);
                media.decode_tick();
                sim.after_frame();
            }
        }
    }

    let report = Report {
        config,
        viewport,
        stats: sim.controller.stats(),
        dispatches: host.counts(),
        samples: std::mem::take(&mut sim.samples),
    };
    sim.controller.unmount();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn markup(args: MarkupArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    println!("{}", render_component(&config, &args.id, !args.ready));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate(args),
        Command::Markup(args) => markup(args),
    }
}
