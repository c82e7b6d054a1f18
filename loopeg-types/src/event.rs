//! Events produced by the arpeggio generator and consumed by the playback engine.

/// MIDI controller used for the vibrato switch (modulation wheel).
pub const CC_VIBRATO: u8 = 1;
/// MIDI controller used for the reverb switch (effects 1 depth).
pub const CC_REVERB: u8 = 91;
/// MIDI controller used for the chorus switch (effects 3 depth).
pub const CC_CHORUS: u8 = 93;

/// Pitch used by zero-velocity placeholder notes (rests, empty patterns).
pub const SILENT_NOTE: u8 = 0;

/// A single synthesizer instruction. Channel tagging happens in the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthEvent {
    ProgramChange { bank: u16, program: u8 },
    ControlChange { controller: u8, value: u8 },
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    /// UI feedback that a block started playing, formatted `"row#block"`.
    Marker(String),
}

impl SynthEvent {
    pub fn is_note_on(&self) -> bool {
        matches!(self, SynthEvent::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, SynthEvent::NoteOff { .. })
    }
}

/// An event at `time` seconds, relative to the start of its arpeggio.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub time: f64,
    pub event: SynthEvent,
}

impl TimedEvent {
    pub fn new(time: f64, event: SynthEvent) -> Self {
        Self { time, event }
    }
}

/// Generated event sequence with its nominal length in seconds.
///
/// `duration` is the time until the next arpeggio should start, which is
/// not necessarily the time of the last event (the final gap is implicit).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arpeggio {
    pub events: Vec<TimedEvent>,
    pub duration: f64,
}

impl Arpeggio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event at `time` relative to the start of this arpeggio.
    pub fn push(&mut self, time: f64, event: SynthEvent) {
        self.events.push(TimedEvent::new(time, event));
    }

    /// Append `other` after this arpeggio's duration, shifting its timestamps.
    pub fn append(&mut self, other: Arpeggio) {
        let offset = self.duration;
        self.events.extend(
            other
                .events
                .into_iter()
                .map(|e| TimedEvent::new(e.time + offset, e.event)),
        );
        self.duration += other.duration;
    }

    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.event.is_note_on()).count()
    }

    pub fn note_off_count(&self) -> usize {
        self.events.iter().filter(|e| e.event.is_note_off()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_offsets_by_duration() {
        let mut a = Arpeggio::new();
        a.push(0.0, SynthEvent::NoteOn { note: 60, velocity: 100 });
        a.push(0.25, SynthEvent::NoteOff { note: 60 });
        a.duration = 0.5;

        let b = a.clone();
        a.append(b);

        assert_eq!(a.events.len(), 4);
        assert!((a.events[2].time - 0.5).abs() < 1e-12);
        assert!((a.events[3].time - 0.75).abs() < 1e-12);
        assert!((a.duration - 1.0).abs() < 1e-12);
        assert_eq!(a.note_on_count(), 2);
        assert_eq!(a.note_off_count(), 2);
    }
}
