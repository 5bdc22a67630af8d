//! Real-time frame pacing for the simulated host
//!
//! `SimulatedHost` only runs frames when told to. [`FrameClock`] tells it to
//! at a fixed rate on a tokio timer, which is what the CLI's `--realtime`
//! mode uses. The future is not `Send` (the host is `Rc`-based), so run it on
//! a current-thread runtime or inside a `LocalSet`.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

use crate::platform::sim::{SimulatedHost, SimulatedMedia};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    pub fn new(fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::ConfigError(format!("fps must be positive, got {}", fps)));
        }
        Ok(FrameClock { fps })
    }

    pub fn frame_ms(&self) -> f64 {
        1000.0 / self.fps
    }

    /// Advance `host` (and `media`'s decoder, if given) once per tick until
    /// `frames` have run or `stop` resolves. `on_frame` runs after each frame
    /// with its index. Returns the number of frames run.
    pub async fn run<F>(
        &self,
        host: &SimulatedHost,
        media: Option<&SimulatedMedia>,
        frames: u64,
        mut stop: oneshot::Receiver<()>,
        mut on_frame: F,
    ) -> u64
    where
        F: FnMut(u64),
    {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / self.fps));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ran = 0;
        while ran < frames {
            tokio::select! {
                _ = ticker.tick() => {
                    host.advance_frame(self.frame_ms());
                    if let Some(media) = media {
                        media.decode_tick();
                    }
                    on_frame(ran);
                    ran += 1;
                }
                _ = &mut stop => break,
            }
        }
        ran
    }
}
