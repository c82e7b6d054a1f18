//! # loopeg-types
//!
//! Shared data model for the loopeg arpeggio looper: note patterns, blocks,
//! per-row track queues, and the timed events the arpeggio generator emits.
//! The playback engine (loopeg-audio) and the project layer (loopeg-core)
//! both build on these types.

pub mod arp;
pub mod event;
pub mod state;

pub use arp::generate;
pub use event::{Arpeggio, SynthEvent, TimedEvent};

// Re-export all state types at crate root for convenience
pub use state::*;

/// Number of MIDI channels; also the maximum number of rows in a project.
pub const MIDI_CHANNELS: usize = 16;

/// Highest valid MIDI note number.
pub const MAX_PITCH: u8 = 127;
