//! Synth backend trait: a semantic-level abstraction over the synthesizer.
//!
//! `SynthBackend` captures what playback *means* to do (select a preset,
//! start a note, flip a controller) independently of how it reaches the
//! synthesizer (MIDI bytes over a midir connection). This enables unit
//! testing of scheduling without any MIDI device.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use loopeg_types::SynthEvent;

/// Result type for backend operations.
pub type BackendResult<T = ()> = Result<T, BackendError>;

/// Error from a backend operation.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError(e.to_string())
    }
}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

/// Semantic-level synthesizer backend.
///
/// Implementations are shared between the scheduler thread and the editor
/// (instrument previews), so they serialize their own device access.
pub trait SynthBackend: Send + Sync {
    /// Select `program` from `bank` on a channel.
    fn select_program(&self, channel: u8, bank: u16, program: u8) -> BackendResult;

    fn note_on(&self, channel: u8, note: u8, velocity: u8) -> BackendResult;

    fn note_off(&self, channel: u8, note: u8) -> BackendResult;

    fn control_change(&self, channel: u8, controller: u8, value: u8) -> BackendResult;

    /// Release every note on every channel.
    fn all_notes_off(&self) -> BackendResult;

    /// A block started playing. `block` reads `"row#block"`.
    fn marker(&self, _block: &str) -> BackendResult {
        Ok(())
    }
}

/// Route one channel-tagged event to the matching backend call.
///
/// Zero-velocity note-ons are placeholders that only hold time; they are
/// not sent.
pub fn send_event(backend: &dyn SynthBackend, channel: u8, event: &SynthEvent) -> BackendResult {
    match *event {
        SynthEvent::ProgramChange { bank, program } => backend.select_program(channel, bank, program),
        SynthEvent::ControlChange { controller, value } => {
            backend.control_change(channel, controller, value)
        }
        SynthEvent::NoteOn { velocity: 0, .. } => Ok(()),
        SynthEvent::NoteOn { note, velocity } => backend.note_on(channel, note, velocity),
        SynthEvent::NoteOff { note } => backend.note_off(channel, note),
        SynthEvent::Marker(ref text) => backend.marker(text),
    }
}

/// Play a single note for `duration` on the calling thread ("test sound").
pub fn audition(
    backend: &dyn SynthBackend,
    channel: u8,
    note: u8,
    velocity: u8,
    duration: Duration,
) -> BackendResult {
    backend.note_on(channel, note, velocity)?;
    thread::sleep(duration);
    backend.note_off(channel, note)
}

// ─── Test Backend ───────────────────────────────────────────────────

/// An operation recorded by `TestBackend` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    SelectProgram { channel: u8, bank: u16, program: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    AllNotesOff,
    Marker(String),
}

/// Backend that records every operation instead of producing sound.
pub struct TestBackend {
    ops: Mutex<Vec<TestOp>>,
    failing_notes: Mutex<Vec<u8>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            failing_notes: Mutex::new(Vec::new()),
        }
    }

    /// Make `note_on` fail for this pitch on every channel.
    pub fn fail_note(&self, note: u8) {
        lock(&self.failing_notes).push(note);
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        lock(&self.ops).clone()
    }

    /// Clear recorded operations.
    pub fn clear(&self) {
        lock(&self.ops).clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        lock(&self.ops).iter().filter(|op| f(op)).count()
    }

    /// Find the first operation matching a predicate.
    pub fn find<F: Fn(&TestOp) -> bool>(&self, f: F) -> Option<TestOp> {
        lock(&self.ops).iter().find(|op| f(op)).cloned()
    }

    /// Markers in the order they were received.
    pub fn markers(&self) -> Vec<String> {
        lock(&self.ops)
            .iter()
            .filter_map(|op| match op {
                TestOp::Marker(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(channel, note)` of every note-on, in order.
    pub fn notes_started(&self) -> Vec<(u8, u8)> {
        lock(&self.ops)
            .iter()
            .filter_map(|op| match *op {
                TestOp::NoteOn { channel, note, .. } => Some((channel, note)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: TestOp) {
        lock(&self.ops).push(op);
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SynthBackend for TestBackend {
    fn select_program(&self, channel: u8, bank: u16, program: u8) -> BackendResult {
        self.record(TestOp::SelectProgram { channel, bank, program });
        Ok(())
    }

    fn note_on(&self, channel: u8, note: u8, velocity: u8) -> BackendResult {
        if lock(&self.failing_notes).contains(&note) {
            return Err(BackendError(format!("note {} rejected", note)));
        }
        self.record(TestOp::NoteOn { channel, note, velocity });
        Ok(())
    }

    fn note_off(&self, channel: u8, note: u8) -> BackendResult {
        self.record(TestOp::NoteOff { channel, note });
        Ok(())
    }

    fn control_change(&self, channel: u8, controller: u8, value: u8) -> BackendResult {
        self.record(TestOp::ControlChange { channel, controller, value });
        Ok(())
    }

    fn all_notes_off(&self) -> BackendResult {
        self.record(TestOp::AllNotesOff);
        Ok(())
    }

    fn marker(&self, block: &str) -> BackendResult {
        self.record(TestOp::Marker(block.to_string()));
        Ok(())
    }
}

// ─── NullBackend ────────────────────────────────────────────────────

/// A no-op backend that silently succeeds. Useful when no MIDI output is
/// available.
pub struct NullBackend;

impl SynthBackend for NullBackend {
    fn select_program(&self, _: u8, _: u16, _: u8) -> BackendResult { Ok(()) }
    fn note_on(&self, _: u8, _: u8, _: u8) -> BackendResult { Ok(()) }
    fn note_off(&self, _: u8, _: u8) -> BackendResult { Ok(()) }
    fn control_change(&self, _: u8, _: u8, _: u8) -> BackendResult { Ok(()) }
    fn all_notes_off(&self) -> BackendResult { Ok(()) }
}
