//! Playback tracking: active-segment resolution and overlay clock sync.
//!
//! The main video clock advances continuously; on every tick the tracker
//! resolves which segment (if any) covers the current position, and keeps
//! the overlay media element's local clock from drifting away from the
//! main one. Resync happens only past a drift threshold - repositioning
//! every frame causes visible stutter on the overlay.

use log::debug;
use uuid::Uuid;

use crate::entities::analysis::AnalysisResult;
use crate::entities::segment::{OverlayMedia, Segment};

/// Drift tolerated between the two clocks before a hard reposition.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.3;

/// First segment in timestamp order whose range contains `t`.
/// Overlapping segments are legal - first match wins, so exactly one
/// segment is ever active. None in gaps and outside the covered range.
pub fn resolve_active_segment(t: f64, segments: &[Segment]) -> Option<&Segment> {
    segments.iter().find(|s| s.contains(t))
}

/// If the overlay's local clock drifted past `threshold` seconds from
/// where the main clock says it should be, return the corrected local
/// time; otherwise None (leave the overlay playing).
pub fn sync_overlay_clock(
    main_time: f64,
    overlay_time: f64,
    segment_timestamp: f64,
    threshold: f64,
) -> Option<f64> {
    let expected = main_time - segment_timestamp;
    if (overlay_time - expected).abs() > threshold {
        Some(expected)
    } else {
        None
    }
}

/// Per-session tracker: resolves the active segment on each tick and
/// remembers it so segment changes can be observed (and logged) once,
/// not every frame.
#[derive(Debug)]
pub struct PlaybackTracker {
    drift_threshold: f64,
    last_active: Option<Uuid>,
}

impl Default for PlaybackTracker {
    fn default() -> Self {
        Self {
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            last_active: None,
        }
    }
}

impl PlaybackTracker {
    pub fn new(drift_threshold: f64) -> Self {
        Self {
            drift_threshold,
            last_active: None,
        }
    }

    /// Resolve the active segment at `t`, tracking changes across ticks.
    pub fn tick<'a>(&mut self, t: f64, analysis: &'a AnalysisResult) -> Option<&'a Segment> {
        let active = resolve_active_segment(t, analysis.segments());
        let id = active.map(|s| s.id);
        if id != self.last_active {
            match active {
                Some(s) => debug!("Active segment at {:.2}s: {} ({})", t, s.id, s.topic),
                None => debug!("No active segment at {:.2}s", t),
            }
            self.last_active = id;
        }
        active
    }

    /// Overlay media for the active segment at `t`, with the segment
    /// whose clock it follows. Video outranks image.
    pub fn active_overlay<'a>(
        &mut self,
        t: f64,
        analysis: &'a AnalysisResult,
    ) -> Option<(&'a Segment, OverlayMedia<'a>)> {
        let seg = self.tick(t, analysis)?;
        let media = seg.overlay_media()?;
        Some((seg, media))
    }

    /// Drift correction for the overlay element, using this tracker's
    /// threshold. See [`sync_overlay_clock`].
    pub fn sync_overlay(
        &self,
        main_time: f64,
        overlay_time: f64,
        segment_timestamp: f64,
    ) -> Option<f64> {
        sync_overlay_clock(
            main_time,
            overlay_time,
            segment_timestamp,
            self.drift_threshold,
        )
    }
}
