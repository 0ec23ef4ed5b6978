//! Color parsing: hex (`#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`) and a few
//! named colors.

use std::fmt;

use image::Rgba;
use serde::Deserialize;

/// An RGBA color as written in a layout document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color(pub Rgba<u8>);

impl Color {
    pub fn white() -> Self {
        Color(Rgba([255, 255, 255, 255]))
    }

    pub fn black() -> Self {
        Color(Rgba([0, 0, 0, 255]))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_color(&value)
            .map(Color)
            .ok_or_else(|| format!("invalid color '{}'", value))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0.0;
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
    }
}

/// Named colors accepted besides hex. Lowercase, sorted.
const NAMED: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("green", [0, 128, 0, 255]),
    ("grey", [128, 128, 128, 255]),
    ("red", [255, 0, 0, 255]),
    ("silver", [192, 192, 192, 255]),
    ("transparent", [0, 0, 0, 0]),
    ("white", [255, 255, 255, 255]),
];

/// Parse a color string into RGBA.
pub fn parse_color(s: &str) -> Option<Rgba<u8>> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).map(Rgba);
    }
    let lower = s.to_ascii_lowercase();
    NAMED
        .binary_search_by(|(name, _)| name.cmp(&lower.as_str()))
        .ok()
        .map(|i| Rgba(NAMED[i].1))
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n << 4 | n);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some([nibble(0)?, nibble(1)?, nibble(2)?, 255]),
        4 => Some([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}
