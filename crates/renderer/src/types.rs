use std::time::Duration;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Use an sRGB swapchain so the linear-light palette is encoded on present.
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains for conversion.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Time constants of the pointer-driven motion model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Low-pass time constant applied to the raw pointer position.
    pub pointer_smoothing: Duration,
    /// Low-pass time constant applied to the drive level.
    pub drive_smoothing: Duration,
    /// Multiplier from smoothed pointer speed to drive target.
    pub drive_gain: f32,
    /// Flow time gained per second at full drive.
    pub flow_speed: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            pointer_smoothing: Duration::from_millis(220),
            drive_smoothing: Duration::from_millis(300),
            drive_gain: 2.2,
            flow_speed: 0.7,
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the `[render]` and `[motion]` config sections plus
/// the CLI overrides, and tells the window runtime how large the surface
/// should be and how the background should animate.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Optional FPS cap; None = render on every redraw opportunity.
    pub target_fps: Option<f32>,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for the swapchain.
    pub color_space: ColorSpaceMode,
    pub motion: MotionConfig,
    /// Freeze flow time while still smoothing the pointer.
    pub reduced_motion: bool,
    pub title: String,
    /// Hidden windows are used by tests and headless smoke runs.
    pub show_window: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            target_fps: None,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            motion: MotionConfig::default(),
            reduced_motion: false,
            title: "heroshade".to_string(),
            show_window: true,
        }
    }
}

/// Failure to bring up a rendering surface. Fatal for the mount that hit it,
/// never for the rest of the process.
#[derive(Debug, thiserror::Error)]
pub enum RenderSetupError {
    #[error("failed to create event loop: {0}")]
    EventLoop(String),
    #[error("failed to create window: {0}")]
    Window(String),
    #[error("failed to create rendering surface: {0}")]
    Surface(String),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    Device(String),
    #[error("background shader failed validation: {0}")]
    Shader(String),
    #[error("surface of {width}x{height} exceeds the GPU limit of {limit}")]
    SurfaceTooLarge { width: u32, height: u32, limit: u32 },
    #[error("render loop is already {0}")]
    InvalidState(&'static str),
    #[error("window thread failed: {0}")]
    Thread(String),
}
