use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use swatch::RenderPalette;
use tracing::info;

use crate::field::{shade, FieldParams};

/// Renders one frame of the background on the CPU.
///
/// Rows are written top-down while the field is evaluated with a bottom-left
/// origin, so the image matches what the window shows. Linear output is sRGB
/// encoded the same way an sRGB swapchain would.
pub fn render_snapshot(
    width: u32,
    height: u32,
    pointer: [f32; 2],
    flow_time: f32,
    palette: &RenderPalette,
) -> RgbaImage {
    let params = FieldParams {
        resolution: [width.max(1) as f32, height.max(1) as f32],
        pointer,
        flow_time,
    };
    RgbaImage::from_fn(width, height, |x, y| {
        let uv = [
            (x as f32 + 0.5) / params.resolution[0],
            1.0 - (y as f32 + 0.5) / params.resolution[1],
        ];
        let color = shade(uv, &params, palette).to_display_space();
        Rgba([color.r, color.g, color.b, 255])
    })
}

/// Renders a snapshot and writes it as PNG.
pub fn save_snapshot(
    path: &Path,
    width: u32,
    height: u32,
    flow_time: f32,
    palette: &RenderPalette,
) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("snapshot size must be non-zero, got {width}x{height}");
    }
    let image = render_snapshot(width, height, [0.5, 0.5], flow_time, palette);
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    info!(path = %path.display(), width, height, "wrote snapshot");
    Ok(())
}
