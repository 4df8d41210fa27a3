use swatch::{default_palette, DisplayPalette, PaletteSource, Srgb8, UniformBridge};

/// Four user-edited colors. Every edit converts the whole palette and writes
/// it through the bridge at once.
#[derive(Debug, Clone)]
pub struct ManualPicker {
    bridge: UniformBridge,
    colors: DisplayPalette,
    source: PaletteSource,
}

impl ManualPicker {
    pub fn new(bridge: UniformBridge, initial: DisplayPalette) -> Self {
        Self::with_source(bridge, initial, PaletteSource::Manual)
    }

    /// Picker whose writes are attributed to `source`; the admin panel edits
    /// through one of these.
    pub fn with_source(bridge: UniformBridge, initial: DisplayPalette, source: PaletteSource) -> Self {
        Self {
            bridge,
            colors: initial,
            source,
        }
    }

    pub fn colors(&self) -> DisplayPalette {
        self.colors
    }

    /// Sets stop `index` (0-based). Returns whether a mounted background took
    /// the write; out-of-range indices change nothing.
    pub fn set_stop(&mut self, index: usize, color: Srgb8) -> bool {
        if self.colors.stop(index).is_none() {
            return false;
        }
        self.colors = self.colors.with_stop(index, color);
        self.apply()
    }

    pub fn set_all(&mut self, palette: DisplayPalette) -> bool {
        self.colors = palette;
        self.apply()
    }

    pub fn reset(&mut self) -> bool {
        self.set_all(default_palette())
    }

    /// Writes the current colors again, e.g. when the picker is reopened.
    pub fn apply(&self) -> bool {
        self.bridge
            .set_palette(self.colors.to_render_space(), self.source.clone())
    }
}
