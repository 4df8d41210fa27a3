//! Renderer crate for heroshade.
//!
//! The crate owns the animated background: the GLSL program, the render loop
//! that advances its uniforms, and the winit/wgpu plumbing that puts it on
//! screen. The overall flow is:
//!
//! ```text
//!   heroshade (controller)          window thread
//!          │ RendererConfig, UniformBridge
//!          ▼
//!   WindowRuntime::spawn ──▶ RenderLoop::mount ──▶ winit event loop
//!          ▲                        │                   │
//!          │ ShellEvent             │ publish           └─▶ tick() ─▶ GpuState::draw
//!          └────────────────────────┴──────────────────────────────▶ GPU UBO
//! ```
//!
//! Producers never touch the render loop directly. They write whole palettes
//! through the `UniformBridge` the loop publishes on mount, and the loop
//! reads the latest committed palette once per frame. `field` is a CPU copy
//! of the fragment program used for snapshots and tests; nothing on the
//! render path depends on it.

mod compile;
pub mod field;
mod gpu;
mod motion;
mod render_loop;
mod runtime;
mod snapshot;
mod types;
mod window;

pub use compile::BACKGROUND_FRAGMENT_GLSL;
pub use motion::{normalize_cursor, MotionFrame, MotionState, PointerPosition, POINTER_REST};
pub use render_loop::{FrameError, FrameSink, LoopPhase, RenderLoop, TickOutcome, UniformSet};
pub use runtime::{
    BoxedTimeSource, FramePacer, ManualTimeSource, SystemTimeSource, TimeSample, TimeSource,
};
pub use snapshot::{render_snapshot, save_snapshot};
pub use types::{Antialiasing, ColorSpaceMode, MotionConfig, RenderSetupError, RendererConfig};
pub use window::{ShellEvent, WindowRuntime, LINE_SCROLL};
