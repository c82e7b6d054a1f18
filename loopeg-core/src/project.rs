//! Editor-side project model: the rows the scheduler plays and the song tempo.

use loopeg_audio::tempo::is_valid_bpm;
use loopeg_audio::SharedTempo;
use loopeg_types::{read_row, write_row, ArpBlock, NotePattern, Row, RowHandle, MIDI_CHANNELS};

use crate::error::ProjectError;

/// Values new projects, rows and blocks start from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDefaults {
    pub bpm: f64,
    /// Row volume in percent.
    pub volume: u8,
    pub pattern: NotePattern,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            volume: 64,
            pattern: NotePattern::default(),
        }
    }
}

/// Rows in channel order plus the shared song tempo.
///
/// Row contents are edited through their handles while playback runs.
/// Adding or removing rows takes effect on the next `start`.
pub struct Project {
    tempo: SharedTempo,
    rows: Vec<RowHandle>,
    max_rows: usize,
    defaults: ProjectDefaults,
}

impl Project {
    pub fn new(defaults: ProjectDefaults) -> Self {
        Self {
            tempo: SharedTempo::new(defaults.bpm),
            rows: Vec::new(),
            max_rows: MIDI_CHANNELS,
            defaults,
        }
    }

    /// Lower the row limit (never above one row per MIDI channel).
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.clamp(1, MIDI_CHANNELS);
        self
    }

    pub fn defaults(&self) -> &ProjectDefaults {
        &self.defaults
    }

    pub fn bpm(&self) -> f64 {
        self.tempo.get()
    }

    pub fn set_bpm(&self, bpm: f64) -> Result<(), ProjectError> {
        if !is_valid_bpm(bpm) {
            return Err(ProjectError::InvalidTempo(bpm));
        }
        self.tempo.set(bpm);
        Ok(())
    }

    /// Tempo cell shared with the scheduler.
    pub fn tempo(&self) -> SharedTempo {
        self.tempo.clone()
    }

    pub fn rows(&self) -> &[RowHandle] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&RowHandle> {
        self.rows.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Append an empty row using the default volume.
    pub fn add_row(&mut self) -> Result<usize, ProjectError> {
        let mut row = Row::new(0);
        row.volume = self.defaults.volume;
        self.push_row(row)
    }

    /// Append `row`, assigning it the next channel.
    pub fn push_row(&mut self, mut row: Row) -> Result<usize, ProjectError> {
        if self.rows.len() >= self.max_rows {
            return Err(ProjectError::TooManyRows(self.max_rows));
        }
        let index = self.rows.len();
        row.channel = index as u8;
        self.rows.push(row.into_handle());
        Ok(index)
    }

    /// Remove a row; later rows move down one channel.
    pub fn remove_row(&mut self, index: usize) -> Option<RowHandle> {
        if index >= self.rows.len() {
            return None;
        }
        let removed = self.rows.remove(index);
        for (i, handle) in self.rows.iter().enumerate().skip(index) {
            write_row(handle).channel = i as u8;
        }
        Some(removed)
    }

    /// Run `f` with the row write-locked.
    pub fn edit_row<R>(&self, index: usize, f: impl FnOnce(&mut Row) -> R) -> Option<R> {
        self.rows.get(index).map(|h| f(&mut write_row(h)))
    }

    /// A block built from the configured defaults.
    pub fn new_block(&self) -> ArpBlock {
        ArpBlock::new(self.defaults.pattern.clone())
    }

    /// Append a default block to row `index`. Returns its position.
    pub fn add_block(&self, index: usize) -> Option<usize> {
        let block = self.new_block();
        self.edit_row(index, |row| row.queue.push(block))
    }

    /// Seconds until every row has played all of its blocks once: the
    /// longest row's total nominal duration.
    pub fn loop_length(&self, bpm: f64) -> f64 {
        self.rows
            .iter()
            .map(|h| read_row(h).queue.nominal_duration(bpm))
            .fold(0.0, f64::max)
    }

    /// Fastest block rate in the project, for proportional block sizing.
    pub fn max_rate(&self) -> Option<f64> {
        self.rows
            .iter()
            .filter_map(|h| read_row(h).queue.max_rate())
            .fold(None, |acc, r| Some(acc.map_or(r, |m: f64| m.max(r))))
    }

    /// Move every row back to its first block.
    pub fn rewind(&self) {
        for handle in &self.rows {
            write_row(handle).queue.rewind();
        }
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new(ProjectDefaults::default())
    }
}
