//! Core engine modules - layout, drag, playback, pipeline
//!
//! These modules form the editing and generation engine, independent of UI.

pub mod drag;
pub mod layout;
pub mod pipeline;
pub mod playback;

// Re-exports for convenience
pub use drag::{round_commit, DragController, DragMode};
pub use layout::{marker_interval, position_percent, time_markers, width_percent, TimeMarker};
pub use pipeline::{
    BatchSummary, EventSink, GenerateError, Generator, MediaProvider, PipelineEvent, PipelineRunner,
};
pub use playback::{resolve_active_segment, sync_overlay_clock, PlaybackTracker};
