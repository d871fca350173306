//! Segment: a time-bounded annotation on the video timeline.
//!
//! Carries the generation prompts, the produced media references and the
//! per-segment keying settings. Status moves through an explicit transition
//! table - callers never string-match their way to "is it done"; illegal
//! transitions are rejected in one place.
//!
//! # Status machine
//!
//! ```text
//! Idle -> GeneratingImage -> ImageSuccess -> GeneratingVideo -> VideoSuccess
//!              |                                   |
//!              +-> Error <-------------------------+
//!
//! Error -> GeneratingImage            (retry from scratch)
//! regenerate image: reset to Idle first (clears both URLs)
//! regenerate video: reset to ImageSuccess first (clears video URL)
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::effects::ChromaKeySettings;

/// User-adjustable duration bounds, seconds.
pub const MIN_DURATION: f64 = 1.0;
pub const MAX_DURATION: f64 = 30.0;
pub const DEFAULT_DURATION: f64 = 5.0;

/// Generation status wire names match the persisted session format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentStatus {
    Idle,
    GeneratingImage,
    ImageSuccess,
    GeneratingVideo,
    VideoSuccess,
    Error,
}

impl SegmentStatus {
    /// Central transition table. Regeneration is not a direct edge - it
    /// goes through [`crate::entities::AnalysisResult::reset_for_regeneration`].
    pub fn can_transition(self, to: SegmentStatus) -> bool {
        use SegmentStatus::*;
        matches!(
            (self, to),
            (Idle, GeneratingImage)
                | (GeneratingImage, ImageSuccess)
                | (GeneratingImage, Error)
                | (ImageSuccess, GeneratingVideo)
                | (GeneratingVideo, VideoSuccess)
                | (GeneratingVideo, Error)
                | (Error, GeneratingImage)
        )
    }

    /// A generation request is currently in flight for this segment.
    /// Doubles as the per-segment in-flight lock: a generating segment
    /// cannot accept a second start.
    pub fn is_generating(self) -> bool {
        matches!(
            self,
            SegmentStatus::GeneratingImage | SegmentStatus::GeneratingVideo
        )
    }
}

impl std::fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SegmentStatus::Idle => "idle",
            SegmentStatus::GeneratingImage => "generating-image",
            SegmentStatus::ImageSuccess => "image-success",
            SegmentStatus::GeneratingVideo => "generating-video",
            SegmentStatus::VideoSuccess => "video-success",
            SegmentStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SegmentStatus,
    pub to: SegmentStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Illegal status transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// Two-phase image generation: phase 1 composites the requested graphic
/// into the original scene, phase 2 strips everything but the graphic onto
/// a flat key-color background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationPhase {
    Composite,
    Isolate,
}

/// Transient progress of an in-flight two-phase image generation.
/// Cleared on success or on reset to idle; never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub phase: GenerationPhase,
    pub message: String,
    pub intermediate_image_url: Option<String>,
}

/// Which overlay media the preview should draw for a segment.
/// Video always wins over image when both exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayMedia<'a> {
    Video(&'a str),
    Image(&'a str),
}

/// Minimal per-segment state the timeline UI needs to render a draggable
/// block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineBlock {
    pub id: Uuid,
    pub timestamp: f64,
    pub duration: f64,
    pub topic: String,
    pub status: SegmentStatus,
    pub thumbnail_url: Option<String>,
}

/// The unit of timeline content. Created once per analysis pass; only
/// retimed, re-prompted or regenerated afterward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    /// Seconds from video start.
    pub timestamp: f64,
    /// Seconds, within [1, 30] and clamped against the video end.
    pub duration: f64,
    /// Formatted "M:SS" label, rewritten on every timestamp change.
    pub time_label: String,
    pub topic: String,
    pub description: String,
    pub prompt: String,
    pub animation_prompt: String,
    pub status: SegmentStatus,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Per-segment keying; defaults applied when absent.
    #[serde(default)]
    pub chroma_key: Option<ChromaKeySettings>,
    /// In-flight generation progress (runtime-only).
    #[serde(skip)]
    pub progress: Option<GenerationProgress>,
}

impl Segment {
    pub fn new(
        timestamp: f64,
        topic: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
        animation_prompt: impl Into<String>,
    ) -> Self {
        let timestamp = timestamp.max(0.0);
        Self {
            id: Uuid::new_v4(),
            timestamp,
            duration: DEFAULT_DURATION,
            time_label: format_time_label(timestamp),
            topic: topic.into(),
            description: description.into(),
            prompt: prompt.into(),
            animation_prompt: animation_prompt.into(),
            status: SegmentStatus::Idle,
            image_url: None,
            video_url: None,
            error: None,
            chroma_key: None,
            progress: None,
        }
    }

    /// End of the segment's time range, seconds.
    pub fn end(&self) -> f64 {
        self.timestamp + self.duration
    }

    /// Whether playback time `t` falls inside [timestamp, end).
    pub fn contains(&self, t: f64) -> bool {
        t >= self.timestamp && t < self.end()
    }

    /// Overlay media to composite, video first.
    pub fn overlay_media(&self) -> Option<OverlayMedia<'_>> {
        if let Some(url) = self.video_url.as_deref() {
            Some(OverlayMedia::Video(url))
        } else {
            self.image_url.as_deref().map(OverlayMedia::Image)
        }
    }

    /// Keying settings with defaults applied when unset.
    pub fn chroma_key_or_default(&self) -> ChromaKeySettings {
        self.chroma_key.clone().unwrap_or_default()
    }

    /// Render-facing snapshot for the timeline bar.
    pub fn block(&self) -> TimelineBlock {
        TimelineBlock {
            id: self.id,
            timestamp: self.timestamp,
            duration: self.duration,
            topic: self.topic.clone(),
            status: self.status,
            thumbnail_url: self.image_url.clone(),
        }
    }
}

/// Seconds to a "M:SS" timeline label.
pub fn format_time_label(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
