//! Chroma key (green screen) engine: transparency keying, edge feathering
//! and spill suppression over RGBA8 buffers.
//!
//! # Algorithm
//!
//! 1. Per pixel, Euclidean distance to the key color.
//! 2. `distance < threshold`: inside the key - alpha scales with distance
//!    (closer to the key color means more transparent), biased upward by
//!    softness.
//! 3. `threshold <= distance < threshold + softness`: feather band - alpha
//!    ramps linearly 0..255 across the band.
//! 4. Otherwise the pixel is untouched.
//! 5. Spill pass on kept pixels: green exceeding max(R, B) is partially
//!    removed, proportional to the spill slider.
//!
//! The tolerance threshold maps `tolerance/100` onto 0..255, not onto the
//! true RGB distance maximum (~441.67). Intentional: the reachable slider
//! range matches how the keying feels in practice. Do not "correct" it.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::color::{self, Rgb};
use crate::entities::frame::{Frame, PixelSource};

/// Pixels per rayon work unit in the keying loop.
const KEY_CHUNK_PIXELS: usize = 16 * 1024;

/// Per-segment keying parameters. Percentage fields live in 0..100.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChromaKeySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "ChromaKeySettings::default_key_color")]
    pub key_color: String,
    #[serde(default = "ChromaKeySettings::default_tolerance")]
    pub tolerance: f32,
    #[serde(default = "ChromaKeySettings::default_spill")]
    pub spill_suppression: f32,
    #[serde(default = "ChromaKeySettings::default_softness")]
    pub edge_softness: f32,
}

impl Default for ChromaKeySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            key_color: Self::default_key_color(),
            tolerance: Self::default_tolerance(),
            spill_suppression: Self::default_spill(),
            edge_softness: Self::default_softness(),
        }
    }
}

impl ChromaKeySettings {
    fn default_key_color() -> String {
        "#00FF00".to_string()
    }

    fn default_tolerance() -> f32 {
        40.0
    }

    fn default_spill() -> f32 {
        50.0
    }

    fn default_softness() -> f32 {
        20.0
    }

    /// Enabled settings with all sliders clamped into 0..100.
    pub fn new(key_color: impl Into<String>, tolerance: f32, spill: f32, softness: f32) -> Self {
        Self {
            enabled: true,
            key_color: key_color.into(),
            tolerance: tolerance.clamp(0.0, 100.0),
            spill_suppression: spill.clamp(0.0, 100.0),
            edge_softness: softness.clamp(0.0, 100.0),
        }
    }

    /// Key color as RGB (malformed hex falls back to pure green).
    pub fn key_rgb(&self) -> Rgb {
        color::hex_to_rgb(&self.key_color)
    }
}

/// Key an RGBA8 buffer in place. No-op when settings are disabled.
pub fn apply_chroma_key(pixels: &mut [u8], settings: &ChromaKeySettings) {
    if !settings.enabled {
        return;
    }

    let key = settings.key_rgb();
    // 0..255 scale by design, not the true max distance - see module docs
    let threshold = settings.tolerance / 100.0 * 255.0;
    // Softness doubles as the feather band width in distance units
    let softness = settings.edge_softness;
    let spill = settings.spill_suppression / 100.0;

    pixels
        .par_chunks_mut(KEY_CHUNK_PIXELS * 4)
        .for_each(|chunk| {
            for px in chunk.chunks_exact_mut(4) {
                let rgb = Rgb::new(px[0], px[1], px[2]);
                let distance = color::color_distance(rgb, key);

                if distance < threshold {
                    // Inside the key: most transparent at the key color,
                    // softness lifts the whole band toward opaque
                    let alpha = (distance / threshold) * 255.0 * (1.0 + softness / 50.0);
                    px[3] = alpha.clamp(0.0, 255.0) as u8;
                } else if distance < threshold + softness {
                    // Feather band: linear 0..255 ramp
                    let t = (distance - threshold) / softness;
                    px[3] = (t * 255.0).clamp(0.0, 255.0) as u8;
                }
                // else: outside both bands, keep as-is

                // Spill pass on pixels that survived keying
                if spill > 0.0 && px[3] > 0 {
                    let green_excess = px[1] as f32 - px[0].max(px[2]) as f32;
                    if green_excess > 0.0 {
                        let reduced = px[1] as f32 - green_excess * spill * 0.7;
                        px[1] = reduced.clamp(0.0, 255.0) as u8;
                    }
                }
            }
        });
}

/// Render a keyed copy of a frame. Always returns a drawable surface:
/// disabled settings yield an unkeyed copy, an empty source stays empty.
pub fn keyed_frame(source: &Frame, settings: &ChromaKeySettings) -> Frame {
    if source.is_empty() {
        debug!("keyed_frame on empty source, returning empty surface");
        return Frame::empty();
    }
    let mut out = source.clone();
    if settings.enabled {
        apply_chroma_key(out.pixels_mut(), settings);
    }
    out
}

/// Eyedropper: sample a color from a visual source at a display-space point.
///
/// The pointer position is relative to the displayed (client) size; it is
/// mapped to native resolution by the native/display ratio before the read.
/// Returns a hex string ready to drop into [`ChromaKeySettings::key_color`].
pub fn sample_color(source: &dyn PixelSource, x: f32, y: f32) -> Option<String> {
    let (nw, nh) = source.native_size();
    let (dw, dh) = source.display_size();
    if nw == 0 || nh == 0 || dw <= 0.0 || dh <= 0.0 {
        return None;
    }

    let scale_x = nw as f32 / dw;
    let scale_y = nh as f32 / dh;
    let px = ((x * scale_x) as i64).clamp(0, nw as i64 - 1) as u32;
    let py = ((y * scale_y) as i64).clamp(0, nh as i64 - 1) as u32;

    match source.read_pixel(px, py) {
        Ok([r, g, b, _a]) => Some(color::rgb_to_hex(r, g, b)),
        Err(e) => {
            debug!("sample_color read failed: {}", e);
            None
        }
    }
}
