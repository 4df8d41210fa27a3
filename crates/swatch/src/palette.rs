use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::color::{LinearRgb, Srgb8};

/// The background always blends exactly four stops.
pub const STOP_COUNT: usize = 4;

/// Fallback palette used whenever a stop is missing or unreadable.
pub const DEFAULT_STOPS: [Srgb8; STOP_COUNT] = [
    Srgb8::from_u32(0x05060a),
    Srgb8::from_u32(0x2094c5),
    Srgb8::from_u32(0xb4532a),
    Srgb8::from_u32(0xd7c8a2),
];

/// Padding sequence for image extraction when fewer than four buckets exist.
pub const EXTRACTOR_FALLBACK_STOPS: [Srgb8; STOP_COUNT] = [
    Srgb8::from_u32(0x2094c5),
    Srgb8::from_u32(0xb4532a),
    Srgb8::from_u32(0xd7c8a2),
    Srgb8::from_u32(0x05060a),
];

/// Four gamma-encoded stops, as authored and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PaletteDocument", into = "PaletteDocument")]
pub struct DisplayPalette {
    stops: [Srgb8; STOP_COUNT],
}

impl DisplayPalette {
    pub const fn new(stops: [Srgb8; STOP_COUNT]) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> [Srgb8; STOP_COUNT] {
        self.stops
    }

    pub fn stop(&self, index: usize) -> Option<Srgb8> {
        self.stops.get(index).copied()
    }

    /// Returns a copy with one stop replaced; out-of-range indices are ignored.
    pub fn with_stop(mut self, index: usize, color: Srgb8) -> Self {
        if let Some(slot) = self.stops.get_mut(index) {
            *slot = color;
        }
        self
    }

    /// Converts all four stops at once so callers commit them together.
    pub fn to_render_space(&self) -> RenderPalette {
        RenderPalette {
            stops: self.stops.map(Srgb8::to_render_space),
        }
    }

    pub fn to_hex_strings(&self) -> [String; STOP_COUNT] {
        self.stops.map(Srgb8::to_hex)
    }
}

impl Default for DisplayPalette {
    fn default() -> Self {
        default_palette()
    }
}

impl std::fmt::Display for DisplayPalette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [c1, c2, c3, c4] = self.stops;
        write!(f, "{c1} {c2} {c3} {c4}")
    }
}

#[derive(Serialize, Deserialize)]
struct PaletteDocument {
    c1: Srgb8,
    c2: Srgb8,
    c3: Srgb8,
    c4: Srgb8,
}

impl From<PaletteDocument> for DisplayPalette {
    fn from(doc: PaletteDocument) -> Self {
        Self::new([doc.c1, doc.c2, doc.c3, doc.c4])
    }
}

impl From<DisplayPalette> for PaletteDocument {
    fn from(palette: DisplayPalette) -> Self {
        let [c1, c2, c3, c4] = palette.stops;
        Self { c1, c2, c3, c4 }
    }
}

/// Four linear-light stops, as bound to the shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPalette {
    stops: [LinearRgb; STOP_COUNT],
}

impl RenderPalette {
    pub fn new(stops: [LinearRgb; STOP_COUNT]) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> [LinearRgb; STOP_COUNT] {
        self.stops
    }

    pub fn to_display_space(&self) -> DisplayPalette {
        DisplayPalette::new(self.stops.map(LinearRgb::to_display_space))
    }
}

impl Default for RenderPalette {
    fn default() -> Self {
        default_palette().to_render_space()
    }
}

/// Raw stops as they come out of a store document. Any of them may be absent
/// or malformed; [`merge_palette`] turns this into a complete palette.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPalette {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c4: Option<String>,
}

impl PartialPalette {
    pub fn from_stops(stops: [Option<String>; STOP_COUNT]) -> Self {
        let [c1, c2, c3, c4] = stops;
        Self { c1, c2, c3, c4 }
    }

    pub fn from_palette(palette: &DisplayPalette) -> Self {
        Self::from_stops(palette.to_hex_strings().map(Some))
    }

    /// Stops with blank entries treated as absent.
    pub fn stops(&self) -> [Option<&str>; STOP_COUNT] {
        [&self.c1, &self.c2, &self.c3, &self.c4].map(|stop| {
            stop.as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
    }

    /// True when all four stops are present (not necessarily well-formed).
    pub fn is_complete(&self) -> bool {
        self.stops().iter().all(Option::is_some)
    }

    pub fn merge(&self, fallback: &DisplayPalette) -> DisplayPalette {
        merge_palette(self, fallback)
    }
}

pub fn default_palette() -> DisplayPalette {
    DisplayPalette::new(DEFAULT_STOPS)
}

/// Fills every missing or malformed stop of `partial` from `fallback`,
/// keeping stop order. Never fails.
pub fn merge_palette(partial: &PartialPalette, fallback: &DisplayPalette) -> DisplayPalette {
    let fallback_stops = fallback.stops();
    let mut merged = fallback_stops;
    for (index, stop) in partial.stops().into_iter().enumerate() {
        let Some(raw) = stop else {
            continue;
        };
        match Srgb8::parse_hex(raw) {
            Ok(color) => merged[index] = color,
            Err(err) => {
                warn!(
                    stop = index + 1,
                    value = raw,
                    fallback = %fallback_stops[index],
                    "malformed palette stop; using fallback ({err})"
                );
            }
        }
    }
    DisplayPalette::new(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(value: &str) -> Srgb8 {
        Srgb8::parse_hex(value).unwrap()
    }

    #[test]
    fn default_palette_matches_brand_colors() {
        let palette = default_palette();
        assert_eq!(palette.to_hex_strings(), ["#05060a", "#2094c5", "#b4532a", "#d7c8a2"]);
    }

    #[test]
    fn merge_fills_missing_stops_in_order() {
        let fallback = default_palette();
        let cases: [[Option<&str>; 4]; 5] = [
            [None, None, None, None],
            [Some("#111111"), None, None, None],
            [None, Some("#222222"), None, Some("#444444")],
            [Some("#111111"), Some("#222222"), Some("#333333"), None],
            [None, None, Some(""), Some("  ")],
        ];

        for case in cases {
            let partial = PartialPalette::from_stops(case.map(|stop| stop.map(str::to_string)));
            let merged = merge_palette(&partial, &fallback);
            assert_eq!(merged.stops().len(), STOP_COUNT);
            for index in 0..STOP_COUNT {
                let expected = match case[index].map(str::trim).filter(|value| !value.is_empty()) {
                    Some(value) => hex(value),
                    None => fallback.stops()[index],
                };
                assert_eq!(merged.stops()[index], expected, "stop {index} of {case:?}");
            }
        }
    }

    #[test]
    fn malformed_stop_fails_closed_to_fallback() {
        let partial = PartialPalette::from_stops([
            Some("#111111".into()),
            Some("not-a-color".into()),
            Some("#33".into()),
            Some("#444444".into()),
        ]);
        let merged = partial.merge(&default_palette());
        assert_eq!(merged.stops()[0], hex("#111111"));
        assert_eq!(merged.stops()[1], DEFAULT_STOPS[1]);
        assert_eq!(merged.stops()[2], DEFAULT_STOPS[2]);
        assert_eq!(merged.stops()[3], hex("#444444"));
    }

    #[test]
    fn completeness_ignores_blank_stops() {
        let mut partial = PartialPalette::from_palette(&default_palette());
        assert!(partial.is_complete());
        partial.c3 = Some(String::new());
        assert!(!partial.is_complete());
    }

    #[test]
    fn display_palette_serializes_as_settings_document() {
        let json = serde_json::to_value(default_palette()).unwrap();
        assert_eq!(json["c1"], "#05060a");
        assert_eq!(json["c4"], "#d7c8a2");

        let parsed: DisplayPalette = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, default_palette());
    }

    #[test]
    fn render_palette_round_trips_through_display_space() {
        let palette = DisplayPalette::new([
            hex("#111111"),
            hex("#222222"),
            hex("#333333"),
            hex("#444444"),
        ]);
        assert_eq!(palette.to_render_space().to_display_space(), palette);
    }

    #[test]
    fn with_stop_replaces_only_the_requested_slot() {
        let palette = default_palette().with_stop(2, hex("#ff0000"));
        assert_eq!(palette.stops()[2], hex("#ff0000"));
        assert_eq!(palette.stops()[1], DEFAULT_STOPS[1]);
        assert_eq!(default_palette().with_stop(9, hex("#ff0000")), default_palette());
    }
}
