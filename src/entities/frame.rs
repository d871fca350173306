//! RGBA8 pixel buffers for overlay preview and color sampling.
//!
//! **Why**: the keying engine and the color sampler both operate on flat
//! RGBA byte buffers; decoding (PNG/JPEG) happens once at the edge and
//! everything downstream is plain slices.
//!
//! **Used by**: chroma_key (keying, sampling), pipeline (frame payloads),
//! CLI (file in / file out).

use std::path::{Path, PathBuf};

use log::debug;

/// Frame loading/decoding errors.
#[derive(Debug)]
pub enum FrameError {
    Decode(String),
    UnsupportedFormat(String),
    Io(String),
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Decode(e) => write!(f, "Decode error: {}", e),
            FrameError::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
            FrameError::Io(e) => write!(f, "IO error: {}", e),
            FrameError::OutOfBounds { x, y, width, height } => {
                write!(f, "Pixel ({}, {}) outside {}x{} frame", x, y, width, height)
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Single RGBA8 raster (4 bytes per pixel, row-major).
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// Source path when decoded from disk (diagnostics only)
    source: Option<PathBuf>,
}

impl Frame {
    /// Wrap an existing RGBA buffer. Buffer length must be width*height*4.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(FrameError::Decode(format!(
                "Buffer size {} does not match {}x{} RGBA ({} bytes)",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, pixels, source: None })
    }

    /// Empty 0x0 frame - the degraded "nothing to draw" surface.
    pub fn empty() -> Self {
        Self { width: 0, height: 0, pixels: Vec::new(), source: None }
    }

    /// Solid-color frame (tests and placeholders).
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Self { width, height, pixels, source: None }
    }

    /// Decode a PNG/JPEG file into an RGBA frame.
    pub fn load(path: &Path) -> Result<Self, FrameError> {
        debug!("Loading frame: {}", path.display());
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" => {}
            other => return Err(FrameError::UnsupportedFormat(format!(".{}", other))),
        }

        let img = image::open(path).map_err(|e| FrameError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
            source: Some(path.to_path_buf()),
        })
    }

    /// Encode to PNG at the given path.
    pub fn save_png(&self, path: &Path) -> Result<(), FrameError> {
        let buf = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| FrameError::Decode("Invalid buffer dimensions".into()))?;
        buf.save(path).map_err(|e| FrameError::Io(e.to_string()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// RGBA at native coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Result<[u8; 4], FrameError> {
        if x >= self.width || y >= self.height {
            return Err(FrameError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Ok([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }
}

/// Capability interface for anything the eyedropper can sample from.
///
/// One implementation per concrete media kind instead of runtime type
/// sniffing: an image knows its natural size, a video element reports its
/// native stream resolution, and both are displayed at some client size.
pub trait PixelSource {
    /// Native (decoded) resolution.
    fn native_size(&self) -> (u32, u32);
    /// On-screen size the pointer coordinates are relative to.
    fn display_size(&self) -> (f32, f32);
    /// Read one RGBA pixel at native coordinates.
    fn read_pixel(&self, x: u32, y: u32) -> Result<[u8; 4], FrameError>;
}

/// An image/canvas frame shown at a known client size.
pub struct DisplayedFrame<'a> {
    pub frame: &'a Frame,
    pub display_width: f32,
    pub display_height: f32,
}

impl PixelSource for DisplayedFrame<'_> {
    fn native_size(&self) -> (u32, u32) {
        self.frame.resolution()
    }

    fn display_size(&self) -> (f32, f32) {
        (self.display_width, self.display_height)
    }

    fn read_pixel(&self, x: u32, y: u32) -> Result<[u8; 4], FrameError> {
        self.frame.pixel(x, y)
    }
}

/// A decoded video frame. The stream resolution may differ from the
/// decoded raster (anamorphic or scaled decode), so it is carried
/// separately the way a video element reports videoWidth/videoHeight.
pub struct VideoFrame<'a> {
    pub frame: &'a Frame,
    pub video_width: u32,
    pub video_height: u32,
    pub display_width: f32,
    pub display_height: f32,
}

impl PixelSource for VideoFrame<'_> {
    fn native_size(&self) -> (u32, u32) {
        (self.video_width, self.video_height)
    }

    fn display_size(&self) -> (f32, f32) {
        (self.display_width, self.display_height)
    }

    fn read_pixel(&self, x: u32, y: u32) -> Result<[u8; 4], FrameError> {
        // Map stream coordinates onto the decoded raster if they differ
        let (fw, fh) = self.frame.resolution();
        if fw == self.video_width && fh == self.video_height {
            return self.frame.pixel(x, y);
        }
        let fx = (x as f32 * fw as f32 / self.video_width.max(1) as f32) as u32;
        let fy = (y as f32 * fh as f32 / self.video_height.max(1) as f32) as u32;
        self.frame.pixel(fx.min(fw.saturating_sub(1)), fy.min(fh.saturating_sub(1)))
    }
}
