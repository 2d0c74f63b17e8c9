//! Row markers for UI position readback.
//!
//! The engine schedules rows ahead of real time, so "what row is the
//! sequencer on" and "what row is audible right now" differ by the
//! lookahead. Every scheduled row pushes a timestamped marker; the UI
//! polls with the backend clock and gets the row whose audio is
//! currently playing. Consumption discards overtaken markers and never
//! reorders.

use alloc::collections::VecDeque;

/// One scheduled row: where the sequencer was, and when it sounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowMarker {
    /// Backend time the row starts sounding.
    pub time: f64,
    /// Sequence position.
    pub pos: usize,
    /// Row within the pattern.
    pub row: usize,
}

/// Monotonic queue of scheduled row markers.
#[derive(Default, Debug)]
pub struct MarkerQueue {
    markers: VecDeque<RowMarker>,
}

impl MarkerQueue {
    pub fn push(&mut self, marker: RowMarker) {
        debug_assert!(
            self.markers.back().map_or(true, |m| m.time <= marker.time),
            "markers must be pushed in time order"
        );
        self.markers.push_back(marker);
    }

    /// The latest marker at or before `now`. Older markers are dropped;
    /// the returned one stays current until overtaken.
    pub fn current(&mut self, now: f64) -> Option<RowMarker> {
        while self.markers.len() >= 2 && self.markers[1].time <= now {
            self.markers.pop_front();
        }
        self.markers.front().copied().filter(|m| m.time <= now)
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(time: f64, row: usize) -> RowMarker {
        RowMarker { time, pos: 0, row }
    }

    #[test]
    fn current_tracks_the_clock() {
        let mut q = MarkerQueue::default();
        for row in 0..4 {
            q.push(marker(row as f64 * 0.5, row));
        }

        assert_eq!(q.current(0.0).unwrap().row, 0);
        assert_eq!(q.current(0.6).unwrap().row, 1);
        assert_eq!(q.current(1.9).unwrap().row, 3);
    }

    #[test]
    fn nothing_audible_before_the_first_marker() {
        let mut q = MarkerQueue::default();
        q.push(marker(1.0, 0));
        assert_eq!(q.current(0.5), None);
        assert_eq!(q.current(1.0).unwrap().row, 0);
    }

    #[test]
    fn overtaken_markers_are_discarded() {
        let mut q = MarkerQueue::default();
        for row in 0..10 {
            q.push(marker(row as f64, row));
        }
        q.current(7.2);
        assert_eq!(q.len(), 3);
        // Going "backwards" still answers with the front marker.
        assert_eq!(q.current(7.5).unwrap().row, 7);
    }
}
