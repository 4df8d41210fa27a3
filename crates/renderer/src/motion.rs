//! Pointer smoothing and the drive/flow accumulator.
//!
//! The background does not animate on wall time alone. Pointer movement
//! "drives" it: the faster the smoothed pointer moves, the faster flow time
//! advances, and both decay back to rest once the pointer stops.

use crate::types::MotionConfig;

/// Below this the speed estimate would divide by (almost) zero.
const MIN_DT: f32 = 1e-4;

/// Normalized pointer position, origin bottom-left, both axes in `[0, 1]`.
pub type PointerPosition = [f32; 2];

pub const POINTER_REST: PointerPosition = [0.5, 0.5];

/// Converts a cursor position in physical pixels (origin top-left) into the
/// shader's bottom-left normalized space.
pub fn normalize_cursor(x: f64, y: f64, width: u32, height: u32) -> PointerPosition {
    let width = f64::from(width.max(1));
    let height = f64::from(height.max(1));
    [(x / width) as f32, (1.0 - y / height) as f32]
}

/// Per-frame values the motion model hands to the uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionFrame {
    pub pointer: PointerPosition,
    pub drive: f32,
    pub flow_time: f32,
}

#[derive(Debug, Clone)]
pub struct MotionState {
    config: MotionConfig,
    target: PointerPosition,
    smoothed: PointerPosition,
    last: PointerPosition,
    drive: f32,
    flow_time: f32,
}

impl MotionState {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            target: POINTER_REST,
            smoothed: POINTER_REST,
            last: POINTER_REST,
            drive: 0.0,
            flow_time: 0.0,
        }
    }

    pub fn set_target(&mut self, target: PointerPosition) {
        self.target = target;
    }

    pub fn target(&self) -> PointerPosition {
        self.target
    }

    pub fn frame(&self) -> MotionFrame {
        MotionFrame {
            pointer: self.smoothed,
            drive: self.drive,
            flow_time: self.flow_time,
        }
    }

    /// Advances both low-pass filters by `dt` seconds. With `reduced_motion`
    /// the pointer is still smoothed but flow time stays where it is.
    pub fn advance(&mut self, dt: f32, reduced_motion: bool) -> MotionFrame {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let alpha_pointer = smoothing_factor(dt, self.config.pointer_smoothing.as_secs_f32());
        for axis in 0..2 {
            self.smoothed[axis] += (self.target[axis] - self.smoothed[axis]) * alpha_pointer;
        }

        let dx = self.smoothed[0] - self.last[0];
        let dy = self.smoothed[1] - self.last[1];
        let speed = (dx * dx + dy * dy).sqrt() / dt.max(MIN_DT);
        self.last = self.smoothed;

        let drive_target = (speed * self.config.drive_gain).min(1.0);
        let alpha_drive = smoothing_factor(dt, self.config.drive_smoothing.as_secs_f32());
        self.drive += (drive_target - self.drive) * alpha_drive;

        if !reduced_motion {
            self.flow_time += dt * self.config.flow_speed * self.drive;
        }

        self.frame()
    }
}

/// `1 - exp(-dt / tau)`; a zero time constant snaps straight to the target.
fn smoothing_factor(dt: f32, tau: f32) -> f32 {
    if tau <= 0.0 {
        1.0
    } else {
        1.0 - (-dt / tau).exp()
    }
}
