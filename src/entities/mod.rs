//! Entities module - the data model, independent of any UI.
//!
//! `AnalysisResult` owns the segment collection and is the only writer of
//! segment state; `Frame` carries RGBA pixels for the preview path; the
//! effects submodule holds the keying engine.

pub mod analysis;
pub mod effects;
pub mod frame;
pub mod segment;

pub use analysis::{AnalysisResult, ModelError, RegenerationScope, TransitionPayload};
pub use effects::{ChromaKeySettings, Rgb};
pub use frame::{DisplayedFrame, Frame, FrameError, PixelSource, VideoFrame};
pub use segment::{
    GenerationPhase, GenerationProgress, OverlayMedia, Segment, SegmentStatus, TimelineBlock,
    TransitionError,
};
