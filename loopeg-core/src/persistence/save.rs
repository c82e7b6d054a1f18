use loopeg_types::{read_row, ArpBlock, ArpMode, ChordShortcut, Row, VariantOffset};

use super::schema::{BlockFile, ProjectFile, RowFile, MODE_DOWN, MODE_RANDOM, MODE_UP, REST_SENTINEL};
use crate::project::Project;

pub fn project_to_file(project: &Project) -> ProjectFile {
    ProjectFile {
        bpm: project.bpm(),
        instruments: project
            .rows()
            .iter()
            .map(|h| row_to_file(&read_row(h)))
            .collect(),
    }
}

fn row_to_file(row: &Row) -> RowFile {
    RowFile {
        mute: row.mute,
        volume: row.volume as i64,
        instrument: row.instrument.program as i64,
        bank: row.instrument.bank as i64,
        arpeggiators: row.queue.blocks().iter().map(block_to_file).collect(),
    }
}

fn block_to_file(block: &ArpBlock) -> BlockFile {
    let p = &block.pattern;
    let chord = p.chord();
    BlockFile {
        repetitions: block.repetitions as i64,
        rate: p.rate,
        note_length: p.note_length,
        ground_note: p.ground_note as i64,
        mute_ground_note: p.ground_silent,
        mode: mode_name(p.mode).map(str::to_string),
        mute: p.mute,
        velocity: p.velocity as i64,
        variants_active: p.variants.iter().map(|s| s.active).collect(),
        variants: p
            .variants
            .iter()
            .map(|s| match s.offset {
                VariantOffset::Interval(i) => i as i64,
                VariantOffset::Rest => REST_SENTINEL,
            })
            .collect(),
        chords_active: ChordShortcut::ALL.iter().map(|c| Some(*c) == chord).collect(),
        vibrato: p.effects.vibrato,
        reverb: p.effects.reverb,
        chorus: p.effects.chorus,
    }
}

fn mode_name(mode: ArpMode) -> Option<&'static str> {
    match mode {
        ArpMode::Up => Some(MODE_UP),
        ArpMode::Down => Some(MODE_DOWN),
        ArpMode::Random => Some(MODE_RANDOM),
        ArpMode::Unordered => None,
    }
}
