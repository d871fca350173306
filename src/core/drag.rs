//! Drag-based retiming: pointer gestures on the timeline become committed
//! model edits.
//!
//! The controller captures the gesture origin on `begin`, converts each
//! pointer-move delta into seconds against the track width, clamps per
//! mode and commits THROUGH the model immediately - live-update design,
//! there is no staged commit on pointer-up. Out-of-range deltas are
//! silently clamped ("sticky at the boundary"), never errors.
//!
//! Only one drag can be active at a time; `begin` while dragging is a
//! no-op (event ownership in the UI is expected to prevent it anyway).

use log::debug;
use uuid::Uuid;

use crate::entities::analysis::{AnalysisResult, ModelError};
use crate::entities::segment::{Segment, MIN_DURATION};

/// Which handle the pointer grabbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    /// Whole bar: timestamp changes, duration preserved.
    Move,
    /// Left edge: timestamp and duration change together.
    ResizeStart,
    /// Right edge: duration changes alone.
    ResizeEnd,
}

/// Gesture origin, captured at `begin`.
#[derive(Clone, Debug)]
struct DragState {
    segment_id: Uuid,
    mode: DragMode,
    origin_x: f32,
    origin_timestamp: f64,
    origin_duration: f64,
}

/// Converts a pointer drag into committed segment retiming.
#[derive(Debug, Default)]
pub struct DragController {
    state: Option<DragState>,
}

/// Commits are written at 0.1s granularity to keep float jitter out of
/// the UI.
pub fn round_commit(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    /// Segment currently being dragged, if any.
    pub fn dragged_segment(&self) -> Option<Uuid> {
        self.state.as_ref().map(|s| s.segment_id)
    }

    /// Capture a gesture. Returns false (and changes nothing) when a drag
    /// is already in progress.
    pub fn begin(&mut self, segment: &Segment, mode: DragMode, pointer_x: f32) -> bool {
        if self.state.is_some() {
            return false;
        }
        debug!(
            "Drag begin: {} {:?} at x={:.1} (t={:.1}, d={:.1})",
            segment.id, mode, pointer_x, segment.timestamp, segment.duration
        );
        self.state = Some(DragState {
            segment_id: segment.id,
            mode,
            origin_x: pointer_x,
            origin_timestamp: segment.timestamp,
            origin_duration: segment.duration,
        });
        true
    }

    /// Pointer moved: compute the candidate retiming and commit it.
    /// No-op when no drag is active or the track has no width yet.
    pub fn update(
        &mut self,
        pointer_x: f32,
        track_width_px: f32,
        analysis: &mut AnalysisResult,
    ) -> Result<(), ModelError> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        if track_width_px <= 0.0 {
            return Ok(());
        }

        let total = analysis.total_duration;
        let delta_px = (pointer_x - state.origin_x) as f64;
        let delta_time = delta_px / track_width_px as f64 * total;
        let id = state.segment_id;

        match state.mode {
            DragMode::Move => {
                let max_t = (total - state.origin_duration).max(0.0);
                let new_t = (state.origin_timestamp + delta_time).clamp(0.0, max_t);
                analysis.update_timestamp(id, round_commit(new_t))?;
            }
            DragMode::ResizeStart => {
                // Left edge: cannot push the start negative, cannot shrink
                // below the 1s minimum from this side
                let clamped_delta = delta_time.clamp(
                    -state.origin_timestamp,
                    state.origin_duration - MIN_DURATION,
                );
                let new_t = round_commit(state.origin_timestamp + clamped_delta);
                let new_d = round_commit(state.origin_duration - clamped_delta);
                if clamped_delta >= 0.0 {
                    // Shrinking: free the room before moving the start
                    analysis.resize_duration(id, new_d)?;
                    analysis.update_timestamp(id, new_t)?;
                } else {
                    // Growing left: move the start before claiming the room
                    analysis.update_timestamp(id, new_t)?;
                    analysis.resize_duration(id, new_d)?;
                }
            }
            DragMode::ResizeEnd => {
                let max_d = (total - state.origin_timestamp).max(MIN_DURATION);
                let new_d = (state.origin_duration + delta_time).clamp(MIN_DURATION, max_d);
                analysis.resize_duration(id, round_commit(new_d))?;
            }
        }
        Ok(())
    }

    /// Pointer released. Every move already committed, so this only
    /// clears the gesture. Returns the retimed segment id, if any.
    pub fn end(&mut self) -> Option<Uuid> {
        let id = self.state.take().map(|s| s.segment_id);
        if let Some(id) = id {
            debug!("Drag end: {}", id);
        }
        id
    }
}
