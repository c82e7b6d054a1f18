//! Dispatch timeline: channel-tagged events of all rows, kept in firing order.

use std::cmp::Ordering;
use std::collections::VecDeque;

use loopeg_types::SynthEvent;

/// An event bound to a row's channel at an absolute session time (seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub time: f64,
    pub row: usize,
    pub channel: u8,
    pub event: SynthEvent,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    ev: ChannelEvent,
}

impl Entry {
    /// Time first, then row index, then the order events were scheduled.
    fn cmp_key(&self, other: &Entry) -> Ordering {
        self.ev
            .time
            .total_cmp(&other.ev.time)
            .then(self.ev.row.cmp(&other.ev.row))
            .then(self.seq.cmp(&other.seq))
    }
}

/// Events ordered by time, then row, then scheduling order.
///
/// Callers must schedule each row's events with non-decreasing times for
/// the row's own order to survive.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: VecDeque<Entry>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time of the earliest pending event.
    pub fn next_time(&self) -> Option<f64> {
        self.entries.front().map(|e| e.ev.time)
    }

    /// Merge a batch in one call. Events keep their relative order on ties.
    pub fn schedule(&mut self, batch: Vec<ChannelEvent>) {
        for ev in batch {
            let entry = Entry {
                seq: self.next_seq,
                ev,
            };
            self.next_seq += 1;
            // New entries carry the highest seq, so they land after all equals.
            let pos = self
                .entries
                .partition_point(|e| e.cmp_key(&entry) != Ordering::Greater);
            self.entries.insert(pos, entry);
        }
    }

    /// Remove and return every event due at `now`, in firing order.
    pub fn pop_due(&mut self, now: f64) -> Vec<ChannelEvent> {
        let due = self.entries.partition_point(|e| e.ev.time <= now);
        self.entries.drain(..due).map(|e| e.ev).collect()
    }

    /// Drop everything still queued. Returns how many events were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(time: f64, row: usize, note: u8) -> ChannelEvent {
        ChannelEvent {
            time,
            row,
            channel: row as u8,
            event: SynthEvent::NoteOn { note, velocity: 100 },
        }
    }

    fn notes(evs: &[ChannelEvent]) -> Vec<u8> {
        evs.iter()
            .map(|e| match e.event {
                SynthEvent::NoteOn { note, .. } => note,
                _ => 0,
            })
            .collect()
    }

    #[test]
    fn fires_in_time_then_row_order() {
        let mut tl = Timeline::new();
        tl.schedule(vec![on(0.5, 1, 1), on(0.0, 1, 2)]);
        tl.schedule(vec![on(0.5, 0, 3), on(0.25, 0, 4)]);

        assert_eq!(tl.next_time(), Some(0.0));
        assert_eq!(notes(&tl.pop_due(1.0)), vec![2, 4, 3, 1]);
        assert!(tl.is_empty());
    }

    #[test]
    fn equal_keys_keep_scheduling_order() {
        let mut tl = Timeline::new();
        tl.schedule(vec![on(0.0, 0, 1), on(0.0, 0, 2)]);
        tl.schedule(vec![on(0.0, 0, 3)]);
        assert_eq!(notes(&tl.pop_due(0.0)), vec![1, 2, 3]);
    }

    #[test]
    fn pop_due_leaves_future_events() {
        let mut tl = Timeline::new();
        tl.schedule(vec![on(0.1, 0, 1), on(0.2, 0, 2), on(0.3, 0, 3)]);
        assert_eq!(notes(&tl.pop_due(0.2)), vec![1, 2]);
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.next_time(), Some(0.3));
        assert!(tl.pop_due(0.25).is_empty());
    }

    #[test]
    fn clear_drops_pending() {
        let mut tl = Timeline::new();
        tl.schedule(vec![on(1.0, 0, 1), on(2.0, 1, 2)]);
        assert_eq!(tl.clear(), 2);
        assert_eq!(tl.next_time(), None);
    }
}
