#![allow(dead_code)]
//! Test harness utilities for scheduler thread tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use loopeg_audio::{PlaybackFeedback, PlaybackScheduler, SchedulerConfig, TestBackend, TestOp};
use loopeg_types::{ArpBlock, NotePattern, Row, RowHandle};

/// Row on `channel` with one single-note block at `rate`.
pub fn row(channel: u8, rate: f64) -> RowHandle {
    let mut row = Row::new(channel);
    row.volume = 100;
    row.queue.push(ArpBlock::new(NotePattern {
        rate,
        note_length: 0.5,
        ground_note: 60 + channel,
        ..NotePattern::default()
    }));
    row.into_handle()
}

pub fn scheduler() -> (PlaybackScheduler, Arc<TestBackend>) {
    let backend = Arc::new(TestBackend::new());
    let config = SchedulerConfig {
        seed: Some(11),
        ..SchedulerConfig::default()
    };
    (PlaybackScheduler::new(backend.clone(), config), backend)
}

/// Wait for the first feedback message matching `pred`, or panic.
pub fn wait_for<F>(rx: &Receiver<PlaybackFeedback>, timeout: Duration, pred: F) -> PlaybackFeedback
where
    F: Fn(&PlaybackFeedback) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(msg) if pred(&msg) => return msg,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for playback feedback"),
        }
    }
}

/// Markers received for channel `ch`.
pub fn markers_for(backend: &TestBackend, ch: u8) -> usize {
    let prefix = format!("{}#", ch);
    backend.markers().iter().filter(|m| m.starts_with(&prefix)).count()
}

/// Index of the last all-notes-off sweep in the recorded operations.
pub fn last_sweep(ops: &[TestOp]) -> Option<usize> {
    ops.iter().rposition(|op| *op == TestOp::AllNotesOff)
}
