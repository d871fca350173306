//! RGB color math for the keying pipeline.
//!
//! Hex parsing never fails: any malformed key color falls back to pure
//! green so the engine always has a usable key. Distance is plain
//! Euclidean in RGB space, range 0..~441.67 (sqrt(3 * 255^2)).

use log::debug;

/// 8-bit RGB triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parse a `#RRGGBB` string (leading `#` optional).
///
/// Malformed input returns pure green instead of erroring - the caller
/// always gets a usable key color.
pub fn hex_to_rgb(hex: &str) -> Rgb {
    let s = hex.trim().trim_start_matches('#');
    if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        debug!("Invalid hex color {:?}, falling back to green", hex);
        return Rgb::GREEN;
    }
    // Length and digit check above make these parses infallible
    let r = u8::from_str_radix(&s[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&s[2..4], 16).unwrap_or(255);
    let b = u8::from_str_radix(&s[4..6], 16).unwrap_or(0);
    Rgb { r, g, b }
}

/// Format RGB as `#rrggbb`, each channel zero-padded.
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Euclidean distance between two colors in RGB space.
pub fn color_distance(a: Rgb, b: Rgb) -> f32 {
    let dr = a.r as f32 - b.r as f32;
    let dg = a.g as f32 - b.g as f32;
    let db = a.b as f32 - b.b as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parse_basic() {
        assert_eq!(hex_to_rgb("#00ff00"), Rgb::GREEN);
        assert_eq!(hex_to_rgb("00FF00"), Rgb::GREEN);
        assert_eq!(hex_to_rgb("#102030"), Rgb::new(0x10, 0x20, 0x30));
    }

    #[test]
    fn test_hex_parse_malformed_falls_back_to_green() {
        for bad in ["", "#", "#abc", "nothex", "#12345", "#1234567", "#gg0000"] {
            assert_eq!(hex_to_rgb(bad), Rgb::GREEN, "input {:?}", bad);
        }
    }

    #[test]
    fn test_round_trip() {
        // Sample the full channel range rather than all 16M combinations
        for r in (0u16..=255).step_by(17) {
            for g in (0u16..=255).step_by(17) {
                for b in (0u16..=255).step_by(17) {
                    let (r, g, b) = (r as u8, g as u8, b as u8);
                    let hex = rgb_to_hex(r, g, b);
                    assert_eq!(hex_to_rgb(&hex), Rgb::new(r, g, b));
                }
            }
        }
    }

    #[test]
    fn test_distance_range() {
        assert_eq!(color_distance(Rgb::GREEN, Rgb::GREEN), 0.0);
        let max = color_distance(Rgb::new(0, 0, 0), Rgb::new(255, 255, 255));
        assert!((max - 441.672_96).abs() < 0.01);
        // White vs green: sqrt(255^2 + 0 + 255^2)
        let wg = color_distance(Rgb::new(255, 255, 255), Rgb::GREEN);
        assert!((wg - 360.624_46).abs() < 0.01);
    }
}
