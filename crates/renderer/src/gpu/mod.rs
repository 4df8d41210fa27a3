//! GPU side of the background.
//!
//! - `context` owns the wgpu instance, device and surface and reconfigures
//!   the swapchain when the window resizes.
//! - `pipeline` compiles the GLSL program into the single render pipeline.
//! - `uniforms` mirrors the std140 block written once per frame.
//! - `state` glues everything together and implements `FrameSink` for the
//!   render loop.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
