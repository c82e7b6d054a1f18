use serde::{Deserialize, Serialize};

use super::chord::ChordShortcut;

/// Number of variant slots every pattern carries.
pub const VARIANT_SLOTS: usize = 3;

/// Largest interval, in semitones, a variant may sit away from the ground note.
pub const MAX_VARIANT_INTERVAL: i8 = 24;

/// Slowest and fastest block rate, as multiples of the song tempo.
pub const RATE_RANGE: std::ops::RangeInclusive<f64> = 0.125..=16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArpMode {
    Up,
    Down,
    Random,
    /// Notes play in construction order: ground first, then the variants.
    #[default]
    Unordered,
}

impl ArpMode {
    pub fn name(&self) -> &'static str {
        match self {
            ArpMode::Up => "Up",
            ArpMode::Down => "Down",
            ArpMode::Random => "Random",
            ArpMode::Unordered => "Unordered",
        }
    }

    pub fn next(&self) -> ArpMode {
        match self {
            ArpMode::Up => ArpMode::Down,
            ArpMode::Down => ArpMode::Random,
            ArpMode::Random => ArpMode::Unordered,
            ArpMode::Unordered => ArpMode::Up,
        }
    }
}

/// What a variant slot plays relative to the ground note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantOffset {
    Interval(i8),
    /// Silence for the length of this slot.
    Rest,
}

impl VariantOffset {
    pub fn interval(self) -> Option<i8> {
        match self {
            VariantOffset::Interval(i) => Some(i),
            VariantOffset::Rest => None,
        }
    }

    /// Resolve against a ground note. `None` when the pitch leaves MIDI range.
    pub fn pitch(self, ground: u8) -> Option<u8> {
        let interval = self.interval()?;
        let pitch = ground as i16 + interval as i16;
        (0..=crate::MAX_PITCH as i16)
            .contains(&pitch)
            .then_some(pitch as u8)
    }
}

impl Default for VariantOffset {
    fn default() -> Self {
        VariantOffset::Interval(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantSlot {
    pub active: bool,
    pub offset: VariantOffset,
}

impl VariantSlot {
    pub fn interval(offset: i8) -> Self {
        Self {
            active: true,
            offset: VariantOffset::Interval(offset),
        }
    }

    pub fn rest() -> Self {
        Self {
            active: true,
            offset: VariantOffset::Rest,
        }
    }
}

/// Synth effect switches sent as controller changes when a block starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockEffects {
    pub vibrato: bool,
    pub reverb: bool,
    pub chorus: bool,
}

/// Arpeggio parameters of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePattern {
    /// Tempo multiplier relative to the song BPM.
    pub rate: f64,
    /// Sounded fraction of each note slot, 0.0..=1.0.
    pub note_length: f64,
    pub ground_note: u8,
    /// Leave the ground note out; variants still resolve against it.
    pub ground_silent: bool,
    pub mode: ArpMode,
    pub mute: bool,
    pub velocity: u8,
    pub variants: [VariantSlot; VARIANT_SLOTS],
    pub effects: BlockEffects,
}

impl Default for NotePattern {
    fn default() -> Self {
        Self {
            rate: 1.0,
            note_length: 0.2,
            ground_note: 60,
            ground_silent: false,
            mode: ArpMode::Unordered,
            mute: false,
            velocity: 100,
            variants: [VariantSlot::default(); VARIANT_SLOTS],
            effects: BlockEffects::default(),
        }
    }
}

impl NotePattern {
    /// Seconds one full pass over the notes takes at `song_bpm`.
    pub fn cycle_duration(&self, song_bpm: f64) -> f64 {
        60.0 / song_bpm / self.rate
    }

    pub fn set_variant(&mut self, index: usize, slot: VariantSlot) {
        if let Some(s) = self.variants.get_mut(index) {
            *s = slot;
        }
    }

    pub fn set_variant_offset(&mut self, index: usize, offset: VariantOffset) {
        if let Some(s) = self.variants.get_mut(index) {
            s.offset = offset;
        }
    }

    pub fn set_variant_active(&mut self, index: usize, active: bool) {
        if let Some(s) = self.variants.get_mut(index) {
            s.active = active;
        }
    }

    /// Intervals of the active, non-rest variants in slot order.
    pub fn active_intervals(&self) -> Vec<i8> {
        self.variants
            .iter()
            .filter(|s| s.active)
            .filter_map(|s| s.offset.interval())
            .collect()
    }

    /// The chord shortcut the current variants amount to, if any.
    pub fn chord(&self) -> Option<ChordShortcut> {
        ChordShortcut::classify(&self.active_intervals())
    }

    /// Overwrite the variant slots with a shortcut's intervals.
    pub fn apply_chord(&mut self, shortcut: ChordShortcut) {
        let mut slots = [VariantSlot::default(); VARIANT_SLOTS];
        for (slot, &interval) in slots.iter_mut().zip(shortcut.intervals()) {
            *slot = VariantSlot::interval(interval);
        }
        self.variants = slots;
    }

    pub fn clear_variants(&mut self) {
        self.variants = [VariantSlot::default(); VARIANT_SLOTS];
    }

    /// Switch a shortcut on, or off when it is the one currently active.
    /// Returns the shortcut active afterwards.
    pub fn toggle_chord(&mut self, shortcut: ChordShortcut) -> Option<ChordShortcut> {
        if self.chord() == Some(shortcut) {
            self.clear_variants();
        } else {
            self.apply_chord(shortcut);
        }
        self.chord()
    }
}
