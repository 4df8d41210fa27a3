use bytemuck::{Pod, Zeroable};
use swatch::STOP_COUNT;

use crate::render_loop::UniformSet;

/// CPU mirror of the `BackgroundParams` std140 block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BackgroundUniforms {
    pub time: f32,
    pub flow_time: f32,
    pub resolution: [f32; 2],
    pub pointer: [f32; 2],
    pub _padding0: [f32; 2],
    pub colors: [[f32; 4]; STOP_COUNT],
}

unsafe impl Zeroable for BackgroundUniforms {}
unsafe impl Pod for BackgroundUniforms {}

impl BackgroundUniforms {
    pub fn from_set(set: &UniformSet) -> Self {
        let stops = set.palette.stops();
        Self {
            time: set.time,
            flow_time: set.flow_time,
            resolution: set.resolution,
            pointer: set.pointer,
            _padding0: [0.0; 2],
            colors: stops.map(|stop| {
                let [r, g, b] = stop.channels();
                [r, g, b, 1.0]
            }),
        }
    }
}
