//! AnalysisResult: top-level session container.
//!
//! Owns the ordered segment collection plus the two analysis summaries.
//! It is the unit of serialization (`to_json` / `from_json`) and the ONLY
//! writer of segment state: every mutation goes through its update
//! functions so the sort and clamp invariants hold after each call.
//!
//! Segments are created once per analysis pass; mid-session insertion is
//! not supported, only retiming / prompt edits / regeneration.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::Context;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::effects::ChromaKeySettings;
use super::segment::{
    format_time_label, GenerationProgress, Segment, SegmentStatus, TransitionError,
    MAX_DURATION, MIN_DURATION,
};

/// Model-level errors surfaced to callers.
#[derive(Debug)]
pub enum ModelError {
    SegmentNotFound(Uuid),
    Transition(TransitionError),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::SegmentNotFound(id) => write!(f, "Segment {} not found", id),
            ModelError::Transition(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<TransitionError> for ModelError {
    fn from(e: TransitionError) -> Self {
        ModelError::Transition(e)
    }
}

/// Data attached to a status transition.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionPayload {
    None,
    ImageUrl(String),
    VideoUrl(String),
    ErrorMessage(String),
}

/// What a regeneration should discard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegenerationScope {
    /// From scratch: both image and video are dropped, back to idle.
    Image,
    /// Animation only: keep the image, drop the video.
    Video,
}

/// One analysis pass over a source video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub visual_summary: String,
    pub audio_summary: String,
    /// Source video length, seconds. Edit clamps are relative to this.
    pub total_duration: f64,
    segments: Vec<Segment>,
}

impl AnalysisResult {
    /// Build a session from a fixed batch of segments. Sorted on entry so
    /// the ordering invariant holds from the first read.
    pub fn new(
        visual_summary: impl Into<String>,
        audio_summary: impl Into<String>,
        total_duration: f64,
        mut segments: Vec<Segment>,
    ) -> Self {
        sort_by_timestamp(&mut segments);
        info!(
            "Analysis session created: {} segments over {:.1}s",
            segments.len(),
            total_duration
        );
        Self {
            visual_summary: visual_summary.into(),
            audio_summary: audio_summary.into(),
            total_duration,
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, id: Uuid) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Render-facing snapshots for the timeline, in timestamp order.
    pub fn blocks(&self) -> Vec<super::segment::TimelineBlock> {
        self.segments.iter().map(Segment::block).collect()
    }

    fn segment_mut(&mut self, id: Uuid) -> Result<&mut Segment, ModelError> {
        self.segments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ModelError::SegmentNotFound(id))
    }

    /// Move a segment. The new timestamp is clamped into
    /// `[0, total - duration]`, the time label is rewritten and the
    /// collection is re-sorted (stable for ties) before returning.
    pub fn update_timestamp(&mut self, id: Uuid, timestamp: f64) -> Result<f64, ModelError> {
        let total = self.total_duration;
        let seg = self.segment_mut(id)?;
        let max_t = (total - seg.duration).max(0.0);
        let clamped = timestamp.clamp(0.0, max_t);
        if clamped != timestamp {
            debug!(
                "Timestamp clamp for {}: {:.2} -> {:.2}",
                id, timestamp, clamped
            );
        }
        seg.timestamp = clamped;
        seg.time_label = format_time_label(clamped);
        sort_by_timestamp(&mut self.segments);
        Ok(clamped)
    }

    /// Resize a segment. Duration is clamped into
    /// `[1, min(30, total - timestamp)]`.
    pub fn update_duration(&mut self, id: Uuid, duration: f64) -> Result<f64, ModelError> {
        let total = self.total_duration;
        let seg = self.segment_mut(id)?;
        let upper = (total - seg.timestamp).min(MAX_DURATION).max(MIN_DURATION);
        let clamped = duration.clamp(MIN_DURATION, upper);
        if clamped != duration {
            debug!("Duration clamp for {}: {:.2} -> {:.2}", id, duration, clamped);
        }
        seg.duration = clamped;
        Ok(clamped)
    }

    /// Resize from a drag gesture. Unlike [`Self::update_duration`] the
    /// 30s slider cap does not apply here: dragging an edge may stretch a
    /// segment all the way to the end of the video. Clamp is
    /// `[1, total - timestamp]`.
    pub fn resize_duration(&mut self, id: Uuid, duration: f64) -> Result<f64, ModelError> {
        let total = self.total_duration;
        let seg = self.segment_mut(id)?;
        let upper = (total - seg.timestamp).max(MIN_DURATION);
        let clamped = duration.clamp(MIN_DURATION, upper);
        if clamped != duration {
            debug!("Resize clamp for {}: {:.2} -> {:.2}", id, duration, clamped);
        }
        seg.duration = clamped;
        Ok(clamped)
    }

    /// Replace both prompts. No validation, empty strings accepted;
    /// status and media references are untouched.
    pub fn update_prompts(
        &mut self,
        id: Uuid,
        prompt: impl Into<String>,
        animation_prompt: impl Into<String>,
    ) -> Result<(), ModelError> {
        let seg = self.segment_mut(id)?;
        seg.prompt = prompt.into();
        seg.animation_prompt = animation_prompt.into();
        Ok(())
    }

    pub fn set_chroma_key(
        &mut self,
        id: Uuid,
        settings: ChromaKeySettings,
    ) -> Result<(), ModelError> {
        self.segment_mut(id)?.chroma_key = Some(settings);
        Ok(())
    }

    /// Surface in-flight generation progress (or clear it with `None`).
    pub fn set_progress(
        &mut self,
        id: Uuid,
        progress: Option<GenerationProgress>,
    ) -> Result<(), ModelError> {
        self.segment_mut(id)?.progress = progress;
        Ok(())
    }

    /// Apply a status transition from the central table, attaching or
    /// clearing media/error/progress as the target state dictates.
    /// Illegal transitions are rejected without touching the segment.
    pub fn transition(
        &mut self,
        id: Uuid,
        to: SegmentStatus,
        payload: TransitionPayload,
    ) -> Result<(), ModelError> {
        let seg = self.segment_mut(id)?;
        let from = seg.status;
        if !from.can_transition(to) {
            return Err(TransitionError { from, to }.into());
        }

        match to {
            SegmentStatus::GeneratingImage | SegmentStatus::GeneratingVideo => {
                seg.error = None;
            }
            SegmentStatus::ImageSuccess => {
                if let TransitionPayload::ImageUrl(url) = &payload {
                    seg.image_url = Some(url.clone());
                }
                seg.progress = None;
            }
            SegmentStatus::VideoSuccess => {
                if let TransitionPayload::VideoUrl(url) = &payload {
                    seg.video_url = Some(url.clone());
                }
            }
            SegmentStatus::Error => {
                if let TransitionPayload::ErrorMessage(msg) = &payload {
                    seg.error = Some(msg.clone());
                }
                seg.progress = None;
            }
            SegmentStatus::Idle => {}
        }

        debug!("Segment {} status {} -> {}", id, from, to);
        seg.status = to;
        Ok(())
    }

    /// Rewind a segment so it can be regenerated.
    pub fn reset_for_regeneration(
        &mut self,
        id: Uuid,
        scope: RegenerationScope,
    ) -> Result<(), ModelError> {
        let seg = self.segment_mut(id)?;
        match scope {
            RegenerationScope::Image => {
                seg.image_url = None;
                seg.video_url = None;
                seg.error = None;
                seg.progress = None;
                seg.status = SegmentStatus::Idle;
            }
            RegenerationScope::Video => {
                seg.video_url = None;
                seg.error = None;
                seg.status = SegmentStatus::ImageSuccess;
            }
        }
        debug!("Segment {} reset for {:?} regeneration", id, scope);
        Ok(())
    }

    // ---- persistence (plain JSON, no binary formats) ----

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut result: Self = serde_json::from_str(json)?;
        // Older files may predate the sort-on-write guarantee
        sort_by_timestamp(&mut result.segments);
        Ok(result)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).with_context(|| format!("Saving session to {}", path.display()))?;
        info!("Session saved: {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Reading session from {}", path.display()))?;
        let result = Self::from_json(&json)
            .with_context(|| format!("Parsing session {}", path.display()))?;
        info!(
            "Session loaded: {} ({} segments)",
            path.display(),
            result.segments.len()
        );
        Ok(result)
    }
}

/// Stable ascending sort; equal timestamps keep their relative order.
fn sort_by_timestamp(segments: &mut [Segment]) {
    segments.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(t: f64, d: f64, topic: &str) -> Segment {
        let mut s = Segment::new(t, topic, "", "prompt", "motion");
        s.duration = d;
        s
    }

    fn session() -> AnalysisResult {
        AnalysisResult::new(
            "visual",
            "audio",
            60.0,
            vec![seg(10.0, 5.0, "b"), seg(0.0, 5.0, "a"), seg(30.0, 5.0, "c")],
        )
    }

    fn is_sorted(a: &AnalysisResult) -> bool {
        a.segments()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }

    #[test]
    fn test_new_sorts_segments() {
        let a = session();
        let topics: Vec<&str> = a.segments().iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, ["a", "b", "c"]);
    }

    #[test]
    fn test_update_timestamp_clamps_and_resorts() {
        let mut a = session();
        let id = a.segments()[0].id; // "a" at t=0

        // Push past the end: clamps to total - duration
        let t = a.update_timestamp(id, 500.0).unwrap();
        assert_eq!(t, 55.0);
        assert!(is_sorted(&a));
        assert_eq!(a.segments().last().unwrap().topic, "a");
        assert_eq!(a.segment(id).unwrap().time_label, "0:55");

        // Negative clamps to zero
        let t = a.update_timestamp(id, -3.0).unwrap();
        assert_eq!(t, 0.0);
        assert_eq!(a.segments()[0].topic, "a");
        assert_eq!(a.segment(id).unwrap().time_label, "0:00");
    }

    #[test]
    fn test_sort_stable_for_equal_timestamps() {
        let mut a = session();
        let id_c = a.segments()[2].id; // "c"
        // Move c onto b's timestamp; b was there first and stays first
        a.update_timestamp(id_c, 10.0).unwrap();
        let topics: Vec<&str> = a.segments().iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, ["a", "b", "c"]);
    }

    #[test]
    fn test_update_duration_clamps() {
        let mut a = session();
        let id = a.segments()[1].id; // t=10 on a 60s timeline

        assert_eq!(a.update_duration(id, 0.2).unwrap(), 1.0);
        assert_eq!(a.update_duration(id, 500.0).unwrap(), 30.0);

        // Near the end the video bound wins over the 30s cap
        let id_c = a.segments()[2].id; // t=30, d=5
        assert_eq!(a.update_duration(id_c, 500.0).unwrap(), 30.0);
        a.update_duration(id_c, 2.0).unwrap();
        assert_eq!(a.update_timestamp(id_c, 55.0).unwrap(), 55.0);
        assert_eq!(a.update_duration(id_c, 20.0).unwrap(), 5.0);
    }

    #[test]
    fn test_resize_end_scenario_from_ten_on_sixty() {
        // {timestamp:10, duration:5} on 60s: an edge drag is bounded by
        // the video end only, not the 30s editor cap
        let mut a = AnalysisResult::new("", "", 60.0, vec![seg(10.0, 5.0, "x")]);
        let id = a.segments()[0].id;
        assert_eq!(a.resize_duration(id, 25.0).unwrap(), 25.0);
        assert_eq!(a.resize_duration(id, 55.0).unwrap(), 50.0);
    }

    #[test]
    fn test_update_prompts_leaves_status_and_media() {
        let mut a = session();
        let id = a.segments()[0].id;
        a.transition(id, SegmentStatus::GeneratingImage, TransitionPayload::None)
            .unwrap();
        a.transition(
            id,
            SegmentStatus::ImageSuccess,
            TransitionPayload::ImageUrl("img.png".into()),
        )
        .unwrap();
        a.transition(id, SegmentStatus::GeneratingVideo, TransitionPayload::None)
            .unwrap();
        a.transition(
            id,
            SegmentStatus::VideoSuccess,
            TransitionPayload::VideoUrl("clip.mp4".into()),
        )
        .unwrap();

        a.update_prompts(id, "new prompt", "new motion").unwrap();
        let s = a.segment(id).unwrap();
        assert_eq!(s.prompt, "new prompt");
        assert_eq!(s.animation_prompt, "new motion");
        assert_eq!(s.status, SegmentStatus::VideoSuccess);
        assert_eq!(s.image_url.as_deref(), Some("img.png"));
        assert_eq!(s.video_url.as_deref(), Some("clip.mp4"));
    }

    #[test]
    fn test_transition_rejects_illegal_edge() {
        let mut a = session();
        let id = a.segments()[0].id;
        let err = a
            .transition(id, SegmentStatus::GeneratingVideo, TransitionPayload::None)
            .unwrap_err();
        assert!(matches!(err, ModelError::Transition(_)));
        assert_eq!(a.segment(id).unwrap().status, SegmentStatus::Idle);
    }

    #[test]
    fn test_transition_unknown_segment() {
        let mut a = session();
        let err = a
            .transition(
                Uuid::new_v4(),
                SegmentStatus::GeneratingImage,
                TransitionPayload::None,
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::SegmentNotFound(_)));
    }

    #[test]
    fn test_error_transition_attaches_message_and_clears_progress() {
        let mut a = session();
        let id = a.segments()[0].id;
        a.transition(id, SegmentStatus::GeneratingImage, TransitionPayload::None)
            .unwrap();
        a.set_progress(
            id,
            Some(GenerationProgress {
                phase: crate::entities::segment::GenerationPhase::Composite,
                message: "compositing".into(),
                intermediate_image_url: None,
            }),
        )
        .unwrap();
        a.transition(
            id,
            SegmentStatus::Error,
            TransitionPayload::ErrorMessage("model refused".into()),
        )
        .unwrap();
        let s = a.segment(id).unwrap();
        assert_eq!(s.error.as_deref(), Some("model refused"));
        assert!(s.progress.is_none());
    }

    #[test]
    fn test_regenerate_image_clears_both_urls() {
        let mut a = session();
        let id = a.segments()[0].id;
        a.transition(id, SegmentStatus::GeneratingImage, TransitionPayload::None)
            .unwrap();
        a.transition(
            id,
            SegmentStatus::ImageSuccess,
            TransitionPayload::ImageUrl("img.png".into()),
        )
        .unwrap();
        a.transition(id, SegmentStatus::GeneratingVideo, TransitionPayload::None)
            .unwrap();
        a.transition(
            id,
            SegmentStatus::VideoSuccess,
            TransitionPayload::VideoUrl("clip.mp4".into()),
        )
        .unwrap();

        a.reset_for_regeneration(id, RegenerationScope::Image).unwrap();
        let s = a.segment(id).unwrap();
        assert_eq!(s.status, SegmentStatus::Idle);
        assert!(s.image_url.is_none());
        assert!(s.video_url.is_none());

        // And generation can restart through the normal path
        a.transition(id, SegmentStatus::GeneratingImage, TransitionPayload::None)
            .unwrap();
    }

    #[test]
    fn test_regenerate_video_keeps_image() {
        let mut a = session();
        let id = a.segments()[0].id;
        a.transition(id, SegmentStatus::GeneratingImage, TransitionPayload::None)
            .unwrap();
        a.transition(
            id,
            SegmentStatus::ImageSuccess,
            TransitionPayload::ImageUrl("img.png".into()),
        )
        .unwrap();
        a.transition(id, SegmentStatus::GeneratingVideo, TransitionPayload::None)
            .unwrap();
        a.transition(
            id,
            SegmentStatus::VideoSuccess,
            TransitionPayload::VideoUrl("clip.mp4".into()),
        )
        .unwrap();

        a.reset_for_regeneration(id, RegenerationScope::Video).unwrap();
        let s = a.segment(id).unwrap();
        assert_eq!(s.status, SegmentStatus::ImageSuccess);
        assert_eq!(s.image_url.as_deref(), Some("img.png"));
        assert!(s.video_url.is_none());
        a.transition(id, SegmentStatus::GeneratingVideo, TransitionPayload::None)
            .unwrap();
    }

    #[test]
    fn test_json_round_trip() {
        let a = session();
        let json = a.to_json().unwrap();
        let back = AnalysisResult::from_json(&json).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn test_save_load_round_trip() {
        let a = session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        a.save(&path).unwrap();
        let back = AnalysisResult::load(&path).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(AnalysisResult::load(Path::new("/nonexistent/session.json")).is_err());
    }
}
