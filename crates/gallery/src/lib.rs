//! Color producers for the heroshade background.
//!
//! Three producers write palettes through the `UniformBridge`; whichever
//! writes last is what the background shows.
//!
//! - `ManualPicker` holds four colors edited by hand and rewrites all of them
//!   on every change.
//! - `AdminSession` loads the saved palette once after login, edits it the
//!   same way as the picker and saves it back. It also manages projects and
//!   cover uploads through the store collaborators.
//! - `Gallery` tracks which project section is on screen. The active
//!   project's explicit palette is written directly; otherwise its cover is
//!   loaded on a worker thread and reduced to four dominant colors by
//!   `extract_dominant_colors`.
//!
//! `StandardCoverLoader` resolves covers from the local asset tree first and
//! the stored URL second.

mod admin;
mod controller;
mod extract;
mod loader;
mod manual;
mod visibility;

pub use admin::{AdminError, AdminGate, AdminSession, Collaborators};
pub use controller::{ExtractionResult, Gallery, GalleryOptions};
pub use extract::{
    extract_dominant_colors, extract_from_image, quantize, ALPHA_CUTOFF, PIXEL_STRIDE,
    QUANT_STEP, SAMPLE_SIZE,
};
pub use loader::{CoverError, CoverLoader, CoverSource, StandardCoverLoader};
pub use manual::ManualPicker;
pub use store::Project;
pub use visibility::{ItemState, ScrollModel, VISIBILITY_THRESHOLD};
