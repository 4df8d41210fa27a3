//! Virtual scroll over full-viewport project sections.
//!
//! Section `i` spans `[i, i + 1)` in viewport units and the viewport spans
//! `[offset, offset + 1)`. A section's intersection ratio is the overlap
//! divided by its own height, so it is the overlap itself.

/// Default share of a section that must be on screen to activate it.
pub const VISIBILITY_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollModel {
    offset: f32,
    sections: usize,
}

impl ScrollModel {
    pub fn new(sections: usize) -> Self {
        Self {
            offset: 0.0,
            sections,
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn sections(&self) -> usize {
        self.sections
    }

    fn max_offset(&self) -> f32 {
        self.sections.saturating_sub(1) as f32
    }

    pub fn set_sections(&mut self, sections: usize) {
        self.sections = sections;
        self.offset = self.offset.clamp(0.0, self.max_offset());
    }

    /// Scrolls by `viewports`, clamped to the first and last section.
    pub fn scroll_by(&mut self, viewports: f32) {
        if !viewports.is_finite() {
            return;
        }
        self.offset = (self.offset + viewports).clamp(0.0, self.max_offset());
    }

    pub fn scroll_to(&mut self, offset: f32) {
        if offset.is_finite() {
            self.offset = offset.clamp(0.0, self.max_offset());
        }
    }

    pub fn ratio(&self, index: usize) -> f32 {
        if index >= self.sections {
            return 0.0;
        }
        let top = index as f32;
        let overlap = (top + 1.0).min(self.offset + 1.0) - top.max(self.offset);
        overlap.clamp(0.0, 1.0)
    }

    pub fn ratios(&self) -> Vec<f32> {
        (0..self.sections).map(|index| self.ratio(index)).collect()
    }

    /// The last section at or above `threshold`, matching how intersection
    /// callbacks deliver entries in document order.
    pub fn active_section(&self, threshold: f32) -> Option<usize> {
        (0..self.sections)
            .rev()
            .find(|index| self.ratio(*index) >= threshold)
    }
}

/// Lifecycle of one gallery item's palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Below the threshold and never resolved.
    Hidden,
    /// On screen but not the active section yet.
    Visible,
    /// Extraction in flight.
    Pending,
    /// Palette known: explicit or extracted and cached.
    Resolved,
    /// Last extraction failed; the next activation retries.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_follow_offset() {
        let mut model = ScrollModel::new(3);
        assert_eq!(model.ratios(), vec![1.0, 0.0, 0.0]);

        model.scroll_by(0.25);
        let ratios = model.ratios();
        assert!((ratios[0] - 0.75).abs() < 1e-6);
        assert!((ratios[1] - 0.25).abs() < 1e-6);
        assert_eq!(ratios[2], 0.0);
    }

    #[test]
    fn scroll_is_clamped_to_sections() {
        let mut model = ScrollModel::new(3);
        model.scroll_by(-4.0);
        assert_eq!(model.offset(), 0.0);
        model.scroll_by(10.0);
        assert_eq!(model.offset(), 2.0);
        model.set_sections(2);
        assert_eq!(model.offset(), 1.0);
        model.set_sections(0);
        assert_eq!(model.offset(), 0.0);
        model.scroll_by(f32::NAN);
        assert_eq!(model.offset(), 0.0);
    }

    #[test]
    fn active_section_is_last_above_threshold() {
        let mut model = ScrollModel::new(3);
        assert_eq!(model.active_section(VISIBILITY_THRESHOLD), Some(0));

        // 0.6 / 0.4 split: both qualify, the later one wins.
        model.scroll_to(0.4);
        assert_eq!(model.active_section(VISIBILITY_THRESHOLD), Some(1));

        // 0.8 / 0.2 split: only the first qualifies.
        model.scroll_to(1.2);
        assert_eq!(model.active_section(VISIBILITY_THRESHOLD), Some(1));

        assert_eq!(ScrollModel::new(0).active_section(VISIBILITY_THRESHOLD), None);
    }
}
