//! CPU mirror of the background fragment program.
//!
//! Every function here has a line-for-line counterpart in
//! [`crate::compile::BACKGROUND_FRAGMENT_GLSL`]. The GPU never calls into
//! this module; it backs the software snapshot export and lets the field and
//! blend properties be tested without a device.

use std::f32::consts::PI;

use swatch::{LinearRgb, RenderPalette};

pub const ZOOM: f32 = 7.0;
pub const POINTER_INFLUENCE: f32 = 0.2;
pub const WARP_SCALE: f32 = 2.5;
pub const WARP_FREQUENCY: f32 = 2.5;
pub const WARP_GAIN: f32 = 1.23;
pub const WARP_STEPS: usize = 3;
pub const CONTRAST: (f32, f32) = (0.12, 0.95);
pub const STOP_POSITIONS: [f32; 3] = [0.28, 0.58, 0.82];
pub const STOP_BLEND: f32 = 0.15;
pub const GRAIN_AMPLITUDE: f32 = 0.08;

/// Inputs shared by every pixel of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    pub resolution: [f32; 2],
    pub pointer: [f32; 2],
    pub flow_time: f32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            resolution: [1.0, 1.0],
            pointer: [0.5, 0.5],
            flow_time: 0.0,
        }
    }
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Classic `fract(sin(dot(p, (12.9898, 78.233))) * 43758.5453)` hash.
pub fn hash(p: [f32; 2]) -> f32 {
    fract((p[0] * 12.9898 + p[1] * 78.233).sin() * 43758.5453)
}

/// Three rounds of sine feedback, wrapped back into `[-1, 1)`.
pub fn warp(p: [f32; 2], t: f32, pointer: [f32; 2]) -> [f32; 2] {
    let mouse01 = [
        0.5 + (pointer[0] - 0.5) * POINTER_INFLUENCE,
        0.5 + (pointer[1] - 0.5) * POINTER_INFLUENCE,
    ];
    let phase = [
        (mouse01[0] - 0.5) * PI + 0.15 * (t * 0.4).sin(),
        (mouse01[1] - 0.5) * PI + 0.15 * (t * 0.4).cos(),
    ];

    let mut p = [(p[0] + 3.0) * WARP_SCALE, (p[1] + 3.0) * WARP_SCALE];
    for _ in 0..WARP_STEPS {
        let (x, y) = (p[0], p[1]);
        p[0] = x + (y * WARP_FREQUENCY + t + phase[0]).cos() / 3.0;
        p[1] = y + (x * WARP_FREQUENCY + 1.57 + phase[1]).cos() / 3.0;

        let (x, y) = (p[0], p[1]);
        p[0] = x + (y + t + 1.57 - phase[1]).sin() / 2.0;
        p[1] = y + (x + t - phase[0]).sin() / 2.0;

        p[0] *= WARP_GAIN;
        p[1] *= WARP_GAIN;
    }

    [
        fract((p[0] + 1.0) * 0.5) * 2.0 - 1.0,
        fract((p[1] + 1.0) * 0.5) * 2.0 - 1.0,
    ]
}

/// Contrast-ramped field value in `[0, 1]` at `uv` (origin bottom-left).
pub fn field(uv: [f32; 2], params: &FieldParams) -> f32 {
    let aspect = params.resolution[0] / params.resolution[1].max(1.0);
    let p = [(uv[0] - 0.5) * aspect / ZOOM, (uv[1] - 0.5) / ZOOM];
    let w = warp(p, params.flow_time, params.pointer);
    let length = (w[0] * w[0] + w[1] * w[1]).sqrt() / std::f32::consts::SQRT_2;
    smoothstep(CONTRAST.0, CONTRAST.1, length)
}

/// Stop weights for a field value. They sum to one by construction.
pub fn blend_weights(field: f32) -> [f32; 4] {
    let k = STOP_POSITIONS.map(|stop| smoothstep(stop - STOP_BLEND, stop + STOP_BLEND, field));
    [1.0 - k[0], k[0] * (1.0 - k[1]), k[1] * (1.0 - k[2]), k[2]]
}

/// Final linear-light color of one pixel, grain included. Values may leave
/// `[0, 1]` by up to the grain amplitude, as on the GPU.
pub fn shade(uv: [f32; 2], params: &FieldParams, palette: &RenderPalette) -> LinearRgb {
    let weights = blend_weights(field(uv, params));
    let mut color = [0.0f32; 3];
    for (stop, weight) in palette.stops().iter().zip(weights) {
        for (channel, value) in color.iter_mut().zip(stop.channels()) {
            *channel += value * weight;
        }
    }

    let grain = hash([uv[0] * params.resolution[0], uv[1] * params.resolution[1]]);
    let offset = (grain - 0.5) * GRAIN_AMPLITUDE;
    LinearRgb(color.map(|channel| channel + offset))
}
