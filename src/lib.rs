//! KEYLINE - Video annotation timeline library
//!
//! Re-exports all modules for use by binary targets.

// Core engine (layout, drag, playback, pipeline)
pub mod core;

// App modules
pub mod cli;
pub mod entities;

// Re-export commonly used types from core
pub use core::drag::{DragController, DragMode};
pub use core::pipeline::{EventSink, Generator, MediaProvider, PipelineEvent, PipelineRunner};
pub use core::playback::PlaybackTracker;

// Re-export entities
pub use entities::{AnalysisResult, ChromaKeySettings, Frame, Segment, SegmentStatus};
