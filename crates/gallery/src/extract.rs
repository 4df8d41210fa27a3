//! Dominant-color extraction for project covers without a stored palette.
//!
//! The cover is squashed into a 100×100 buffer, every fourth pixel is
//! sampled, and each channel is snapped to a multiple of 32. The four most
//! common snapped colors become the palette, most common first.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use swatch::{DisplayPalette, Srgb8, EXTRACTOR_FALLBACK_STOPS, STOP_COUNT};

pub const SAMPLE_SIZE: u32 = 100;
/// Sample every Nth pixel of the downsampled buffer.
pub const PIXEL_STRIDE: usize = 4;
/// Pixels with alpha below this are ignored.
pub const ALPHA_CUTOFF: u8 = 128;
pub const QUANT_STEP: u8 = 32;

/// Snapped values per channel: 0, 32, .., 224 and 255.
const LEVELS: usize = 9;
const BUCKETS: usize = LEVELS * LEVELS * LEVELS;

/// Downsamples `image` and extracts its dominant palette.
pub fn extract_from_image(image: &DynamicImage) -> DisplayPalette {
    let rgba = image.to_rgba8();
    let sample = if rgba.dimensions() == (SAMPLE_SIZE, SAMPLE_SIZE) {
        rgba
    } else {
        downsample(&rgba)
    };
    extract_dominant_colors(sample.as_raw())
}

fn downsample(image: &RgbaImage) -> RgbaImage {
    if image.width() == 0 || image.height() == 0 {
        return RgbaImage::new(SAMPLE_SIZE, SAMPLE_SIZE);
    }
    imageops::resize(image, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
}

/// Tallies quantized colors over tightly packed RGBA bytes.
///
/// Ties keep first-encounter order. Slots left empty when fewer than four
/// buckets were seen are filled from `EXTRACTOR_FALLBACK_STOPS` at the same
/// index.
pub fn extract_dominant_colors(rgba: &[u8]) -> DisplayPalette {
    let mut counts = [0u32; BUCKETS];
    let mut seen = Vec::new();

    for pixel in rgba.chunks_exact(4).step_by(PIXEL_STRIDE) {
        if pixel[3] < ALPHA_CUTOFF {
            continue;
        }
        let bucket = bucket_index(pixel[0], pixel[1], pixel[2]);
        if counts[bucket] == 0 {
            seen.push(bucket);
        }
        counts[bucket] += 1;
    }

    // `sort_by` is stable, so equal counts stay in encounter order.
    seen.sort_by(|a, b| counts[*b].cmp(&counts[*a]));

    let mut stops = EXTRACTOR_FALLBACK_STOPS;
    for (slot, bucket) in seen.into_iter().take(STOP_COUNT).enumerate() {
        stops[slot] = bucket_color(bucket);
    }
    DisplayPalette::new(stops)
}

fn level(channel: u8) -> usize {
    (f32::from(channel) / f32::from(QUANT_STEP)).round() as usize
}

fn level_value(level: usize) -> u8 {
    (level * usize::from(QUANT_STEP)).min(255) as u8
}

fn bucket_index(r: u8, g: u8, b: u8) -> usize {
    (level(r) * LEVELS + level(g)) * LEVELS + level(b)
}

fn bucket_color(bucket: usize) -> Srgb8 {
    let b = bucket % LEVELS;
    let g = (bucket / LEVELS) % LEVELS;
    let r = bucket / (LEVELS * LEVELS);
    Srgb8::new(level_value(r), level_value(g), level_value(b))
}

/// Snaps one channel the way the extractor does.
pub fn quantize(channel: u8) -> u8 {
    level_value(level(channel))
}
