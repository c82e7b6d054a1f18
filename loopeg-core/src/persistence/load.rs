use loopeg_audio::tempo::is_valid_bpm;
use loopeg_types::state::pattern::MAX_VARIANT_INTERVAL;
use loopeg_types::{
    ArpBlock, ArpMode, BlockEffects, Instrument, NotePattern, Row, VariantOffset, VariantSlot,
    MAX_PITCH, RATE_RANGE, VARIANT_SLOTS,
};

use super::schema::{BlockFile, ProjectFile, RowFile, MODE_DOWN, MODE_RANDOM, MODE_UP, REST_SENTINEL};
use crate::error::ProjectError;
use crate::project::{Project, ProjectDefaults};

/// Largest bank number a bank-select pair (MSB + LSB) can address.
const MAX_BANK: i64 = 0x3FFF;

/// Build a project from its JSON text, rejecting values playback can't use.
pub fn decode_project(
    json: &str,
    defaults: ProjectDefaults,
    max_rows: usize,
) -> Result<Project, ProjectError> {
    let file: ProjectFile = serde_json::from_str(json)?;
    let project = Project::new(defaults).with_max_rows(max_rows);
    populate(project, &file)
}

fn populate(mut project: Project, file: &ProjectFile) -> Result<Project, ProjectError> {
    if !is_valid_bpm(file.bpm) {
        return Err(ProjectError::invalid("bpm", format!("{} is not a usable tempo", file.bpm)));
    }
    project.set_bpm(file.bpm)?;

    for (i, row_file) in file.instruments.iter().enumerate() {
        let row = row_from_file(i, row_file)?;
        project.push_row(row).map_err(|e| match e {
            ProjectError::TooManyRows(max) => {
                ProjectError::invalid("instruments", format!("more than {} rows", max))
            }
            other => other,
        })?;
    }
    Ok(project)
}

fn row_from_file(index: usize, file: &RowFile) -> Result<Row, ProjectError> {
    let path = format!("instruments[{}]", index);
    let mut row = Row::new(0);
    row.mute = file.mute;
    row.volume = ranged(&format!("{}.volume", path), file.volume, 0, 100)? as u8;
    row.instrument = Instrument {
        program: ranged(&format!("{}.instrument", path), file.instrument, 0, 127)? as u8,
        bank: ranged(&format!("{}.bank", path), file.bank, 0, MAX_BANK)? as u16,
    };
    for (j, block_file) in file.arpeggiators.iter().enumerate() {
        let block = block_from_file(&format!("{}.arpeggiators[{}]", path, j), block_file)?;
        row.queue.push(block);
    }
    Ok(row)
}

fn block_from_file(path: &str, file: &BlockFile) -> Result<ArpBlock, ProjectError> {
    let field = |name: &str| format!("{}.{}", path, name);

    if !RATE_RANGE.contains(&file.rate) {
        return Err(ProjectError::invalid(
            field("rate"),
            format!("{} is outside {}..{}", file.rate, RATE_RANGE.start(), RATE_RANGE.end()),
        ));
    }
    if !(0.0..=1.0).contains(&file.note_length) {
        return Err(ProjectError::invalid(
            field("note_length"),
            format!("{} is outside 0..1", file.note_length),
        ));
    }
    let repetitions = ranged(&field("repetitions"), file.repetitions, 1, u32::MAX as i64)? as u32;

    let pattern = NotePattern {
        rate: file.rate,
        note_length: file.note_length,
        ground_note: ranged(&field("ground_note"), file.ground_note, 0, MAX_PITCH as i64)? as u8,
        ground_silent: file.mute_ground_note,
        mode: mode_from_name(path, file.mode.as_deref()),
        mute: file.mute,
        velocity: ranged(&field("velocity"), file.velocity, 0, 127)? as u8,
        variants: variants_from_file(path, &file.variants_active, &file.variants)?,
        effects: BlockEffects {
            vibrato: file.vibrato,
            reverb: file.reverb,
            chorus: file.chorus,
        },
    };
    Ok(ArpBlock::new(pattern).with_repetitions(repetitions))
}

fn mode_from_name(path: &str, name: Option<&str>) -> ArpMode {
    match name {
        Some(MODE_UP) => ArpMode::Up,
        Some(MODE_DOWN) => ArpMode::Down,
        Some(MODE_RANDOM) => ArpMode::Random,
        None => ArpMode::Unordered,
        Some(other) => {
            log::warn!(target: "persistence", "{}.mode: unknown mode '{}', playing in order", path, other);
            ArpMode::Unordered
        }
    }
}

fn variants_from_file(
    path: &str,
    active: &[bool],
    offsets: &[i64],
) -> Result<[VariantSlot; VARIANT_SLOTS], ProjectError> {
    if active.len() != VARIANT_SLOTS {
        return Err(ProjectError::invalid(
            format!("{}.variants_active", path),
            format!("expected {} entries, found {}", VARIANT_SLOTS, active.len()),
        ));
    }
    if offsets.len() != VARIANT_SLOTS {
        return Err(ProjectError::invalid(
            format!("{}.variants", path),
            format!("expected {} entries, found {}", VARIANT_SLOTS, offsets.len()),
        ));
    }

    let mut slots = [VariantSlot::default(); VARIANT_SLOTS];
    for (i, slot) in slots.iter_mut().enumerate() {
        let offset = match offsets[i] {
            REST_SENTINEL => VariantOffset::Rest,
            o => VariantOffset::Interval(ranged(
                &format!("{}.variants[{}]", path, i),
                o,
                -(MAX_VARIANT_INTERVAL as i64),
                MAX_VARIANT_INTERVAL as i64,
            )? as i8),
        };
        *slot = VariantSlot {
            active: active[i],
            offset,
        };
    }
    Ok(slots)
}

fn ranged(path: &str, value: i64, min: i64, max: i64) -> Result<i64, ProjectError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ProjectError::invalid(path, format!("{} is outside {}..={}", value, min, max)))
    }
}
