use serde::{Deserialize, Serialize};

use super::pattern::NotePattern;
use crate::arp::generate;
use crate::event::{Arpeggio, SynthEvent, CC_CHORUS, CC_REVERB, CC_VIBRATO};

/// A note pattern played `repetitions` times in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArpBlock {
    /// Ordinal within the owning queue; kept dense by the queue.
    pub id: usize,
    pub repetitions: u32,
    pub pattern: NotePattern,
}

impl Default for ArpBlock {
    fn default() -> Self {
        Self::new(NotePattern::default())
    }
}

impl ArpBlock {
    pub fn new(pattern: NotePattern) -> Self {
        Self {
            id: 0,
            repetitions: 1,
            pattern,
        }
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions.max(1);
        self
    }

    pub fn nominal_rate(&self) -> f64 {
        self.pattern.rate
    }

    /// Seconds the whole block lasts at `song_bpm`.
    pub fn nominal_duration(&self, song_bpm: f64) -> f64 {
        self.repetitions.max(1) as f64 * self.pattern.cycle_duration(song_bpm)
    }

    /// Expand into effect switches followed by every repetition.
    /// Random mode draws a fresh order for each repetition.
    pub fn expand(&self, song_bpm: f64, rng: &mut fastrand::Rng) -> Arpeggio {
        let mut arp = Arpeggio::new();
        let fx = self.pattern.effects;
        for (controller, on) in [
            (CC_VIBRATO, fx.vibrato),
            (CC_REVERB, fx.reverb),
            (CC_CHORUS, fx.chorus),
        ] {
            let value = if on { 127 } else { 0 };
            arp.push(0.0, SynthEvent::ControlChange { controller, value });
        }
        for _ in 0..self.repetitions.max(1) {
            arp.append(generate(&self.pattern, song_bpm, rng));
        }
        arp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::pattern::VariantSlot;

    #[test]
    fn expand_repeats_and_sums_durations() {
        let mut pattern = NotePattern {
            note_length: 0.5,
            ..NotePattern::default()
        };
        pattern.set_variant(0, VariantSlot::interval(7));
        let block = ArpBlock::new(pattern).with_repetitions(3);
        let arp = block.expand(120.0, &mut fastrand::Rng::with_seed(1));

        assert_eq!(arp.note_on_count(), 6);
        assert!((arp.duration - 1.5).abs() < 1e-9);
        assert!((block.nominal_duration(120.0) - arp.duration).abs() < 1e-9);

        let last_on = arp
            .events
            .iter()
            .rev()
            .find(|e| e.event.is_note_on())
            .map(|e| e.time);
        assert_eq!(last_on, Some(1.25));
    }

    #[test]
    fn effects_lead_the_block() {
        let mut block = ArpBlock::default();
        block.pattern.effects.reverb = true;
        let arp = block.expand(120.0, &mut fastrand::Rng::with_seed(1));
        assert_eq!(
            arp.events[..3].iter().map(|e| e.event.clone()).collect::<Vec<_>>(),
            vec![
                SynthEvent::ControlChange { controller: CC_VIBRATO, value: 0 },
                SynthEvent::ControlChange { controller: CC_REVERB, value: 127 },
                SynthEvent::ControlChange { controller: CC_CHORUS, value: 0 },
            ]
        );
        assert!(arp.events[..3].iter().all(|e| e.time == 0.0));
    }

    #[test]
    fn zero_repetitions_play_once() {
        let mut block = ArpBlock::default();
        block.repetitions = 0;
        assert_eq!(block.expand(60.0, &mut fastrand::Rng::with_seed(1)).note_on_count(), 1);
        assert!((block.nominal_duration(60.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn nominal_rate_is_pattern_rate() {
        let block = ArpBlock::new(NotePattern {
            rate: 4.0,
            ..NotePattern::default()
        });
        assert_eq!(block.nominal_rate(), 4.0);
        assert!((block.nominal_duration(120.0) - 0.125).abs() < 1e-9);
    }
}
