use serde::{Deserialize, Serialize};

/// Offsets that count towards the pentatonic shortcut.
const PENTATONIC_OFFSETS: [i8; 8] = [2, 4, 7, 9, 12, -3, -5, -7];

/// One-click chord presets that fill the variant slots of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordShortcut {
    Major,
    Minor,
    Pentatonic,
}

impl ChordShortcut {
    pub const ALL: [ChordShortcut; 3] = [
        ChordShortcut::Major,
        ChordShortcut::Minor,
        ChordShortcut::Pentatonic,
    ];

    /// Semitone offsets from the ground note, excluding the ground itself.
    pub fn intervals(&self) -> &'static [i8] {
        match self {
            ChordShortcut::Major => &[4, 7],
            ChordShortcut::Minor => &[3, 7],
            ChordShortcut::Pentatonic => &[2, 4, 7],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChordShortcut::Major => "Major",
            ChordShortcut::Minor => "Minor",
            ChordShortcut::Pentatonic => "Penta",
        }
    }

    /// Position in [`ChordShortcut::ALL`], used by the project file's
    /// `chords_active` flags.
    pub fn index(&self) -> usize {
        match self {
            ChordShortcut::Major => 0,
            ChordShortcut::Minor => 1,
            ChordShortcut::Pentatonic => 2,
        }
    }

    /// Classify a set of active interval offsets.
    ///
    /// Pentatonic wins when at least three distinct offsets fall in the
    /// pentatonic set; otherwise major needs both 4 and 7, minor both 3 and 7.
    pub fn classify(offsets: &[i8]) -> Option<ChordShortcut> {
        let mut penta: Vec<i8> = offsets
            .iter()
            .copied()
            .filter(|o| PENTATONIC_OFFSETS.contains(o))
            .collect();
        penta.sort_unstable();
        penta.dedup();
        if penta.len() >= 3 {
            return Some(ChordShortcut::Pentatonic);
        }

        let has = |o: i8| offsets.contains(&o);
        if has(4) && has(7) {
            Some(ChordShortcut::Major)
        } else if has(3) && has(7) {
            Some(ChordShortcut::Minor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_triads() {
        assert_eq!(ChordShortcut::classify(&[4, 7]), Some(ChordShortcut::Major));
        assert_eq!(ChordShortcut::classify(&[7, 4]), Some(ChordShortcut::Major));
        assert_eq!(ChordShortcut::classify(&[3, 7]), Some(ChordShortcut::Minor));
        assert_eq!(ChordShortcut::classify(&[3]), None);
        assert_eq!(ChordShortcut::classify(&[]), None);
    }

    #[test]
    fn pentatonic_takes_priority() {
        // 2, 4, 7 also contains the major triad
        assert_eq!(
            ChordShortcut::classify(&[2, 4, 7]),
            Some(ChordShortcut::Pentatonic)
        );
        assert_eq!(
            ChordShortcut::classify(&[-3, -5, 12]),
            Some(ChordShortcut::Pentatonic)
        );
    }

    #[test]
    fn pentatonic_counts_distinct_offsets() {
        assert_eq!(ChordShortcut::classify(&[2, 2, 9]), None);
        assert_eq!(ChordShortcut::classify(&[4, 4, 7]), Some(ChordShortcut::Major));
    }

    #[test]
    fn intervals_classify_as_themselves() {
        for shortcut in ChordShortcut::ALL {
            assert_eq!(ChordShortcut::classify(shortcut.intervals()), Some(shortcut));
            assert_eq!(ChordShortcut::ALL[shortcut.index()], shortcut);
        }
    }
}
