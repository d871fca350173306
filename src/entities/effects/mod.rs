//! Pixel effects applied to overlay media before compositing.
//!
//! Keying runs on the preview path: the active segment's overlay frame is
//! keyed with that segment's settings, then drawn over the base video.

pub mod chroma_key;
pub mod color;

pub use chroma_key::{apply_chroma_key, keyed_frame, sample_color, ChromaKeySettings};
pub use color::{color_distance, hex_to_rgb, rgb_to_hex, Rgb};
