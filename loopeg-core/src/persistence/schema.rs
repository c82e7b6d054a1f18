//! On-disk JSON layout. Numeric fields are read wide and range-checked in
//! `load` so bad values produce a field-level error instead of a parse error.

use serde::{Deserialize, Serialize};

/// Variant offset that marks a silent slot.
pub const REST_SENTINEL: i64 = -99;

pub const MODE_UP: &str = "UP";
pub const MODE_DOWN: &str = "DOWN";
pub const MODE_RANDOM: &str = "RANDOM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    #[serde(default)]
    pub instruments: Vec<RowFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFile {
    #[serde(default)]
    pub mute: bool,
    #[serde(default = "default_volume")]
    pub volume: i64,
    /// Program number of the row's preset.
    #[serde(default)]
    pub instrument: i64,
    #[serde(default)]
    pub bank: i64,
    #[serde(default)]
    pub arpeggiators: Vec<BlockFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFile {
    #[serde(default = "default_repetitions")]
    pub repetitions: i64,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_note_length")]
    pub note_length: f64,
    #[serde(default = "default_ground_note")]
    pub ground_note: i64,
    #[serde(default)]
    pub mute_ground_note: bool,
    /// `"UP"`, `"DOWN"`, `"RANDOM"`, or null for construction order.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub mute: bool,
    #[serde(default = "default_velocity")]
    pub velocity: i64,
    #[serde(default = "default_flags")]
    pub variants_active: Vec<bool>,
    #[serde(default = "default_offsets")]
    pub variants: Vec<i64>,
    /// Written for readers that want the highlighted shortcut; ignored on
    /// load since it follows from the variants.
    #[serde(default = "default_flags")]
    pub chords_active: Vec<bool>,
    #[serde(default)]
    pub vibrato: bool,
    #[serde(default)]
    pub reverb: bool,
    #[serde(default)]
    pub chorus: bool,
}

fn default_bpm() -> f64 {
    60.0
}

fn default_volume() -> i64 {
    64
}

fn default_repetitions() -> i64 {
    1
}

fn default_rate() -> f64 {
    1.0
}

fn default_note_length() -> f64 {
    0.2
}

fn default_ground_note() -> i64 {
    60
}

fn default_velocity() -> i64 {
    100
}

fn default_flags() -> Vec<bool> {
    vec![false; 3]
}

fn default_offsets() -> Vec<i64> {
    vec![0; 3]
}
