//! Timeline geometry - pure time <-> normalized-position math.
//!
//! Everything here is stateless: seconds in, percent of the track out.
//! The divide-by-zero guard matters during initial load, before the video
//! metadata (and therefore the real duration) has arrived.

/// Timestamp as a percent of the track, in [0, 100].
/// Returns 0 while `total` is unknown (<= 0).
pub fn position_percent(timestamp: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (timestamp / total * 100.0).clamp(0.0, 100.0)
}

/// Segment width as a percent of the track. Callers layer a visual
/// minimum (e.g. a 2% floor) on top so tiny segments stay clickable -
/// that is a rendering concern, not geometry.
pub fn width_percent(duration: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    duration / total * 100.0
}

/// One ruler tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeMarker {
    pub seconds: f64,
    pub percent: f64,
}

/// Ascending, finite tick sequence at a fixed interval. Plain struct
/// iterator, so it can be cloned and restarted.
#[derive(Clone, Debug)]
pub struct TimeMarkers {
    total: f64,
    interval: f64,
    next_idx: u64,
}

impl Iterator for TimeMarkers {
    type Item = TimeMarker;

    fn next(&mut self) -> Option<TimeMarker> {
        if self.interval <= 0.0 || self.total <= 0.0 {
            return None;
        }
        let seconds = self.next_idx as f64 * self.interval;
        if seconds > self.total {
            return None;
        }
        self.next_idx += 1;
        Some(TimeMarker {
            seconds,
            percent: position_percent(seconds, self.total),
        })
    }
}

/// Ruler ticks over `[0, total]` every `interval` seconds.
pub fn time_markers(total: f64, interval: f64) -> TimeMarkers {
    TimeMarkers {
        total,
        interval,
        next_idx: 0,
    }
}

/// Tick interval for a zoom level expressed as pixels per second.
/// Denser zoom gets finer ticks, mirroring the playhead ruler ladder.
pub fn marker_interval(pixels_per_second: f32) -> f64 {
    if pixels_per_second > 50.0 {
        1.0
    } else if pixels_per_second > 20.0 {
        2.0
    } else if pixels_per_second > 8.0 {
        5.0
    } else if pixels_per_second > 2.0 {
        10.0
    } else {
        30.0
    }
}
