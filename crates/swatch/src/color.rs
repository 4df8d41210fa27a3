use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("color value must not be empty")]
    Empty,
    #[error("invalid hex color '{0}'; expected #rgb or #rrggbb")]
    InvalidHex(String),
}

/// Gamma-encoded 8-bit color as authored in the admin panel and stored in
/// project documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Srgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Srgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from a packed `0xRRGGBB` value.
    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    /// Parses `#rgb`, `#rrggbb`, `0xrrggbb` or bare `rrggbb`.
    pub fn parse_hex(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ColorParseError::Empty);
        }

        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidHex(trimmed.to_string()));
        }

        let expanded = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|ch| [ch, ch]).collect(),
            _ => return Err(ColorParseError::InvalidHex(trimmed.to_string())),
        };

        u32::from_str_radix(&expanded, 16)
            .map(Self::from_u32)
            .map_err(|_| ColorParseError::InvalidHex(trimmed.to_string()))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Standard sRGB decode (IEC 61966-2-1) into linear light.
    pub fn to_render_space(self) -> LinearRgb {
        LinearRgb([
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ])
    }
}

impl fmt::Display for Srgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Srgb8 {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for Srgb8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Srgb8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse_hex(&raw).map_err(de::Error::custom)
    }
}

/// Linear-light color triple consumed by the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearRgb(pub [f32; 3]);

impl LinearRgb {
    pub fn channels(self) -> [f32; 3] {
        self.0
    }

    /// sRGB encode back to 8-bit, rounding to the nearest code value.
    pub fn to_display_space(self) -> Srgb8 {
        Srgb8::new(
            linear_to_srgb(self.0[0]),
            linear_to_srgb(self.0[1]),
            linear_to_srgb(self.0[2]),
        )
    }
}

fn srgb_to_linear(value: u8) -> f32 {
    let c = value as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(value: f32) -> u8 {
    let l = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let encoded = if l <= 0.003_130_8 {
        12.92 * l
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}
