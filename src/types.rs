use crate::internals::NO_MEASUREMENT;

/// One decoded capture: a full scan's worth of range measurements plus the
/// device timestamp of the scan.
///
/// Produced once per capture exchange and owned by the caller; the driver
/// keeps nothing of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Distances in millimeters, one entry per step index from 0 to
    /// `max_size - 1`. Indices outside the measured range, and steps where
    /// the sensor reported no valid return, hold the sentinel −1. Sensor
    /// sentinels are passed through unchanged, never reinterpreted.
    pub distances: Vec<i64>,

    /// Device timestamp of the scan, a 24-bit millisecond counter. It wraps
    /// on the sensor's schedule; the decoder does not correct for wrapping.
    pub timestamp: u32,
}

impl Capture {
    /// Returns the measured distance at a step index, or `None` for the
    /// sentinel (no measurement) or an out-of-range index.
    pub fn distance_at(&self, step: usize) -> Option<i64> {
        match self.distances.get(step) {
            Some(&d) if d != NO_MEASUREMENT => Some(d),
            _ => None,
        }
    }

    /// Number of step slots in the capture (the sensor's `max_size`).
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Returns `true` if the capture holds no step slots.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}
