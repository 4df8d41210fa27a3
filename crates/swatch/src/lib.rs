//! Palette types and the live palette handle shared between the renderer and
//! the color producers.
//!
//! The background shader blends four ordered color stops. They are authored
//! and stored gamma-encoded (`#rrggbb`), but the shader consumes linear-light
//! floats, so the crate keeps the two representations apart:
//!
//! ```text
//!   "#2094C5" ──parse──▶ Srgb8 ──to_render_space──▶ LinearRgb ──▶ RenderPalette
//!                          ▲                            │
//!                          └──────to_display_space──────┘
//! ```
//!
//! [`UniformBridge`] is the only way a producer reaches the running shader. It
//! exposes nothing but whole-palette writes, so time, resolution and pointer
//! state stay private to the render loop.

mod bridge;
mod color;
mod palette;

pub use bridge::{CommittedPalette, PaletteHandle, PaletteSource, Publication, UniformBridge};
pub use color::{ColorParseError, LinearRgb, Srgb8};
pub use palette::{
    default_palette, merge_palette, DisplayPalette, PartialPalette, RenderPalette,
    DEFAULT_STOPS, EXTRACTOR_FALLBACK_STOPS, STOP_COUNT,
};
