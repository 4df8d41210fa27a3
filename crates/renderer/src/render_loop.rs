//! Per-frame driver of the background.
//!
//! ```text
//!   Uninitialized ──mount──▶ Running ──dispose──▶ Disposed
//!         │                   │  ▲
//!         └─ setup error      └──┘ tick / resize / pointer
//! ```
//!
//! The loop owns the uniform set. Each tick derives `dt` from its clock, runs
//! the motion filters, reads the palette currently committed through the
//! bridge and hands the result to a [`FrameSink`] for exactly one draw. The
//! sink is the GPU state in the window and a recording fake in tests.

use swatch::{Publication, RenderPalette, UniformBridge};
use tracing::{debug, error, info, warn};

use crate::motion::{MotionState, PointerPosition, POINTER_REST};
use crate::runtime::BoxedTimeSource;
use crate::types::{MotionConfig, RenderSetupError};

/// Everything the background program reads for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSet {
    /// Seconds since mount.
    pub time: f32,
    pub flow_time: f32,
    pub resolution: [f32; 2],
    pub pointer: PointerPosition,
    pub palette: RenderPalette,
}

impl UniformSet {
    pub fn initial(size: (u32, u32)) -> Self {
        Self {
            time: 0.0,
            flow_time: 0.0,
            resolution: [size.0.max(1) as f32, size.1.max(1) as f32],
            pointer: POINTER_REST,
            palette: RenderPalette::default(),
        }
    }
}

/// Why a frame could not be presented.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("surface lost")]
    Lost,
    #[error("surface outdated")]
    Outdated,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("{0}")]
    Other(String),
}

/// Receives one draw per tick.
pub trait FrameSink {
    /// Reconfigures the target; called before the next draw.
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, uniforms: &UniformSet) -> Result<(), FrameError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Uninitialized,
    Running,
    Disposed,
}

impl LoopPhase {
    fn describe(self) -> &'static str {
        match self {
            LoopPhase::Uninitialized => "uninitialized",
            LoopPhase::Running => "running",
            LoopPhase::Disposed => "disposed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is not running; nothing happened.
    Idle,
    Drawn,
    /// The frame was dropped and the next tick may try again.
    Skipped,
    /// The surface was reconfigured after being lost or outdated.
    Reconfigured,
    /// The loop disposed itself; the caller should stop scheduling.
    Fatal,
}

pub struct RenderLoop<S: FrameSink> {
    phase: LoopPhase,
    sink: Option<S>,
    bridge: UniformBridge,
    publication: Option<Publication>,
    clock: BoxedTimeSource,
    motion: MotionState,
    reduced_motion: bool,
    uniforms: UniformSet,
    size: (u32, u32),
    last_sample: f64,
    frames: u64,
    stats_window_start: f64,
    stats_frames: u32,
}

impl<S: FrameSink> RenderLoop<S> {
    pub fn new(
        bridge: UniformBridge,
        motion: MotionConfig,
        reduced_motion: bool,
        clock: BoxedTimeSource,
    ) -> Self {
        Self {
            phase: LoopPhase::Uninitialized,
            sink: None,
            bridge,
            publication: None,
            clock,
            motion: MotionState::new(motion),
            reduced_motion,
            uniforms: UniformSet::initial((1, 1)),
            size: (1, 1),
            last_sample: 0.0,
            frames: 0,
            stats_window_start: 0.0,
            stats_frames: 0,
        }
    }

    /// Acquires the sink, resets the uniforms and publishes the palette
    /// through the bridge. A failing `acquire` leaves the loop uninitialized
    /// and the bridge untouched.
    pub fn mount<F>(&mut self, size: (u32, u32), acquire: F) -> Result<(), RenderSetupError>
    where
        F: FnOnce() -> Result<S, RenderSetupError>,
    {
        if self.phase != LoopPhase::Uninitialized {
            return Err(RenderSetupError::InvalidState(self.phase.describe()));
        }

        let sink = acquire()?;
        let size = (size.0.max(1), size.1.max(1));
        self.sink = Some(sink);
        self.size = size;
        self.uniforms = UniformSet::initial(size);
        self.clock.reset();
        self.last_sample = 0.0;
        self.publication = Some(self.bridge.publish(self.uniforms.palette));
        self.phase = LoopPhase::Running;
        info!(
            width = size.0,
            height = size.1,
            reduced_motion = self.reduced_motion,
            "background mounted"
        );
        Ok(())
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Sets the raw pointer target in normalized bottom-left coordinates.
    pub fn set_pointer(&mut self, target: PointerPosition) {
        self.motion.set_target(target);
    }

    /// Updates the resolution uniform and the sink before the next draw.
    /// Zero-sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.phase != LoopPhase::Running {
            return;
        }
        self.size = (width, height);
        self.uniforms.resolution = [width as f32, height as f32];
        if let Some(sink) = self.sink.as_mut() {
            sink.resize(width, height);
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != LoopPhase::Running {
            return TickOutcome::Idle;
        }

        let sample = self.clock.sample();
        let dt = (sample.seconds - self.last_sample).max(0.0) as f32;
        self.last_sample = sample.seconds;

        let motion = self.motion.advance(dt, self.reduced_motion);
        self.uniforms.time = sample.seconds as f32;
        self.uniforms.flow_time = motion.flow_time;
        self.uniforms.pointer = motion.pointer;
        if let Some(publication) = self.publication.as_ref() {
            self.uniforms.palette = publication.snapshot().palette;
        }

        let Some(sink) = self.sink.as_mut() else {
            return TickOutcome::Idle;
        };
        let result = sink.draw(&self.uniforms);

        match result {
            Ok(()) => {
                self.frames += 1;
                self.record_stats(sample.seconds);
                TickOutcome::Drawn
            }
            Err(FrameError::Lost | FrameError::Outdated) => {
                let (width, height) = self.size;
                sink.resize(width, height);
                TickOutcome::Reconfigured
            }
            Err(FrameError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                TickOutcome::Skipped
            }
            Err(FrameError::Other(message)) => {
                warn!(%message, "frame dropped; retrying next frame");
                TickOutcome::Skipped
            }
            Err(FrameError::OutOfMemory) => {
                error!("surface out of memory; disposing background");
                self.dispose();
                TickOutcome::Fatal
            }
        }
    }

    /// Retracts the bridge publication and drops the sink. Idempotent.
    pub fn dispose(&mut self) {
        if self.phase == LoopPhase::Disposed {
            return;
        }
        let was_running = self.phase == LoopPhase::Running;
        self.phase = LoopPhase::Disposed;
        if let Some(mut publication) = self.publication.take() {
            publication.retract();
        }
        self.sink = None;
        if was_running {
            info!(frames = self.frames, "background disposed");
        }
    }

    fn record_stats(&mut self, now: f64) {
        self.stats_frames += 1;
        let elapsed = now - self.stats_window_start;
        if elapsed >= 1.0 {
            debug!(
                fps = (f64::from(self.stats_frames) / elapsed).round(),
                frame_count = self.frames,
                time = self.uniforms.time,
                flow_time = self.uniforms.flow_time,
                "render stats"
            );
            self.stats_frames = 0;
            self.stats_window_start = now;
        }
    }
}

impl<S: FrameSink> Drop for RenderLoop<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
