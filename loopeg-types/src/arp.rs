//! Arpeggio generation: turns a [`NotePattern`] into one cycle of timed events.

use crate::event::{Arpeggio, SynthEvent, SILENT_NOTE};
use crate::state::pattern::{ArpMode, NotePattern};

/// One entry of the candidate note set. `Rest` sorts below every pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ArpNote {
    Rest,
    Pitch(u8),
}

fn candidate_notes(pattern: &NotePattern) -> Vec<ArpNote> {
    let mut notes = Vec::with_capacity(1 + pattern.variants.len());
    if !pattern.ground_silent {
        notes.push(ArpNote::Pitch(pattern.ground_note));
    }
    for slot in pattern.variants.iter().filter(|s| s.active) {
        if slot.offset.interval().is_none() {
            notes.push(ArpNote::Rest);
        } else if let Some(pitch) = slot.offset.pitch(pattern.ground_note) {
            notes.push(ArpNote::Pitch(pitch));
        }
    }
    notes
}

fn order(notes: &mut [ArpNote], mode: ArpMode, rng: &mut fastrand::Rng) {
    match mode {
        ArpMode::Up => notes.sort(),
        ArpMode::Down => notes.sort_by(|a, b| b.cmp(a)),
        ArpMode::Random => rng.shuffle(notes),
        ArpMode::Unordered => {}
    }
}

/// Generate one cycle of `pattern` at `song_bpm`.
///
/// The cycle lasts `(60 / bpm) / rate` seconds regardless of how many notes
/// are active; each note gets an equal slot and sounds for `note_length` of
/// it. An empty note set yields a single zero-velocity placeholder spanning
/// the whole cycle, so timing is kept even for silent blocks.
pub fn generate(pattern: &NotePattern, song_bpm: f64, rng: &mut fastrand::Rng) -> Arpeggio {
    debug_assert!(song_bpm > 0.0 && pattern.rate > 0.0);

    let cycle = pattern.cycle_duration(song_bpm);
    let mut notes = candidate_notes(pattern);
    let mut arp = Arpeggio::new();

    if notes.is_empty() {
        arp.push(0.0, SynthEvent::NoteOn { note: SILENT_NOTE, velocity: 0 });
        arp.push(cycle, SynthEvent::NoteOff { note: SILENT_NOTE });
        arp.duration = cycle;
        return arp;
    }

    order(&mut notes, pattern.mode, rng);

    let slot = cycle / notes.len() as f64;
    let sounded = slot * pattern.note_length.clamp(0.0, 1.0);
    arp.events.reserve(notes.len() * 2);

    for (i, note) in notes.iter().enumerate() {
        let start = slot * i as f64;
        let (pitch, velocity) = match *note {
            ArpNote::Pitch(p) if pattern.mute => (p, 0),
            ArpNote::Pitch(p) => (p, pattern.velocity),
            ArpNote::Rest => (SILENT_NOTE, 0),
        };
        arp.push(start, SynthEvent::NoteOn { note: pitch, velocity });
        arp.push(start + sounded, SynthEvent::NoteOff { note: pitch });
    }
    arp.duration = slot * notes.len() as f64;
    arp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::pattern::{VariantOffset, VariantSlot};

    const EPS: f64 = 1e-9;

    fn rng() -> fastrand::Rng {
        fastrand::Rng::with_seed(7)
    }

    fn note_ons(arp: &Arpeggio) -> Vec<(f64, u8, u8)> {
        arp.events
            .iter()
            .filter_map(|e| match e.event {
                SynthEvent::NoteOn { note, velocity } => Some((e.time, note, velocity)),
                _ => None,
            })
            .collect()
    }

    fn pitches(arp: &Arpeggio) -> Vec<u8> {
        note_ons(arp).into_iter().map(|(_, n, _)| n).collect()
    }

    fn triad(mode: ArpMode) -> NotePattern {
        let mut p = NotePattern {
            mode,
            note_length: 0.5,
            ..NotePattern::default()
        };
        p.set_variant(0, VariantSlot::interval(7));
        p.set_variant(1, VariantSlot::interval(-5));
        p.set_variant(2, VariantSlot::interval(4));
        p
    }

    #[test]
    fn single_note_scenario() {
        let p = NotePattern {
            note_length: 0.5,
            ..NotePattern::default()
        };
        let arp = generate(&p, 120.0, &mut rng());
        assert_eq!(arp.events.len(), 2);
        assert_eq!(arp.events[0].event, SynthEvent::NoteOn { note: 60, velocity: 100 });
        assert!(arp.events[0].time.abs() < EPS);
        assert_eq!(arp.events[1].event, SynthEvent::NoteOff { note: 60 });
        assert!((arp.events[1].time - 0.25).abs() < EPS);
        assert!((arp.duration - 0.5).abs() < EPS);
    }

    #[test]
    fn note_count_divides_the_cycle() {
        for mode in [ArpMode::Up, ArpMode::Down, ArpMode::Random, ArpMode::Unordered] {
            let arp = generate(&triad(mode), 120.0, &mut rng());
            assert_eq!(arp.note_on_count(), 4);
            assert_eq!(arp.note_off_count(), 4);
            // Four notes share the same half-second cycle as one note would.
            assert!((arp.duration - 0.5).abs() < EPS);
            let starts: Vec<f64> = note_ons(&arp).iter().map(|n| n.0).collect();
            for (i, t) in starts.iter().enumerate() {
                assert!((t - 0.125 * i as f64).abs() < EPS);
            }
        }
    }

    #[test]
    fn modes_order_notes() {
        assert_eq!(pitches(&generate(&triad(ArpMode::Up), 120.0, &mut rng())), vec![55, 60, 64, 67]);
        assert_eq!(pitches(&generate(&triad(ArpMode::Down), 120.0, &mut rng())), vec![67, 64, 60, 55]);
        assert_eq!(
            pitches(&generate(&triad(ArpMode::Unordered), 120.0, &mut rng())),
            vec![60, 67, 55, 64]
        );
    }

    #[test]
    fn up_and_down_are_idempotent() {
        for mode in [ArpMode::Up, ArpMode::Down] {
            let p = triad(mode);
            let a = generate(&p, 97.0, &mut rng());
            let b = generate(&p, 97.0, &mut fastrand::Rng::with_seed(99));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn random_is_a_permutation() {
        let p = triad(ArpMode::Random);
        let mut r = rng();
        let mut seen_other_order = false;
        let first = pitches(&generate(&p, 120.0, &mut r));
        for _ in 0..50 {
            let mut got = pitches(&generate(&p, 120.0, &mut r));
            if got != first {
                seen_other_order = true;
            }
            got.sort_unstable();
            assert_eq!(got, vec![55, 60, 64, 67]);
        }
        assert!(seen_other_order);
    }

    #[test]
    fn note_length_bounds_gap() {
        let mut p = triad(ArpMode::Up);
        p.note_length = 1.0;
        let arp = generate(&p, 120.0, &mut rng());
        // NoteOff of each note lands exactly on the next NoteOn.
        for pair in arp.events.chunks(2).collect::<Vec<_>>().windows(2) {
            assert!((pair[0][1].time - pair[1][0].time).abs() < EPS);
        }

        p.note_length = 0.0;
        let arp = generate(&p, 120.0, &mut rng());
        for pair in arp.events.chunks(2) {
            assert!((pair[1].time - pair[0].time).abs() < EPS);
        }
    }

    #[test]
    fn empty_set_is_a_placeholder_rest() {
        let p = NotePattern {
            ground_silent: true,
            rate: 2.0,
            ..NotePattern::default()
        };
        let arp = generate(&p, 120.0, &mut rng());
        assert_eq!(
            arp.events[0].event,
            SynthEvent::NoteOn { note: SILENT_NOTE, velocity: 0 }
        );
        assert!((arp.events[1].time - 0.25).abs() < EPS);
        assert!((arp.duration - 0.25).abs() < EPS);
    }

    #[test]
    fn silent_ground_still_anchors_variants() {
        let mut p = NotePattern {
            ground_silent: true,
            mode: ArpMode::Up,
            ..NotePattern::default()
        };
        p.set_variant(0, VariantSlot::interval(4));
        p.set_variant(1, VariantSlot::interval(7));
        assert_eq!(pitches(&generate(&p, 120.0, &mut rng())), vec![64, 67]);
    }

    #[test]
    fn rest_slot_sorts_lowest_and_is_silent() {
        let mut p = NotePattern {
            mode: ArpMode::Up,
            ..NotePattern::default()
        };
        p.set_variant(0, VariantSlot::interval(-12));
        p.set_variant(1, VariantSlot::rest());
        let ons = note_ons(&generate(&p, 120.0, &mut rng()));
        assert_eq!(ons.len(), 3);
        assert_eq!((ons[0].1, ons[0].2), (SILENT_NOTE, 0));
        assert_eq!((ons[1].1, ons[1].2), (48, 100));
        assert_eq!((ons[2].1, ons[2].2), (60, 100));
    }

    #[test]
    fn muted_pattern_keeps_timing() {
        let mut p = triad(ArpMode::Up);
        p.mute = true;
        let arp = generate(&p, 120.0, &mut rng());
        assert_eq!(arp.note_on_count(), 4);
        assert!(note_ons(&arp).iter().all(|n| n.2 == 0));
        assert!((arp.duration - 0.5).abs() < EPS);
    }

    #[test]
    fn out_of_range_variants_are_dropped() {
        let mut p = NotePattern {
            ground_note: 120,
            ..NotePattern::default()
        };
        p.set_variant(0, VariantSlot::interval(12));
        p.set_variant(1, VariantSlot::interval(-12));
        assert_eq!(pitches(&generate(&p, 120.0, &mut rng())), vec![120, 108]);
    }

    #[test]
    fn inactive_slots_are_ignored() {
        let mut p = NotePattern::default();
        p.variants[0] = VariantSlot {
            active: false,
            offset: VariantOffset::Interval(7),
        };
        assert_eq!(generate(&p, 120.0, &mut rng()).note_on_count(), 1);
    }

    #[test]
    fn fractional_rate_keeps_precision() {
        let p = NotePattern {
            rate: 0.125,
            note_length: 0.5,
            ..NotePattern::default()
        };
        let arp = generate(&p, 120.0, &mut rng());
        assert!((arp.duration - 4.0).abs() < EPS);
        assert!((arp.events[1].time - 2.0).abs() < EPS);
    }
}
