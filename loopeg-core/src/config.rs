use std::path::{Path, PathBuf};
use std::time::Duration;

use loopeg_audio::SchedulerConfig;
use loopeg_types::{NotePattern, MAX_PITCH, MIDI_CHANNELS, RATE_RANGE};
use serde::Deserialize;

use crate::project::ProjectDefaults;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<f64>,
    volume: Option<u8>,
    rate: Option<f64>,
    note_length: Option<f64>,
    ground_note: Option<u8>,
    velocity: Option<u8>,
}

#[derive(Deserialize, Default)]
struct PlaybackConfig {
    quantum_us: Option<u64>,
    telemetry_interval_secs: Option<f64>,
    overrun_budget_us: Option<u64>,
    max_rows: Option<usize>,
}

#[derive(Deserialize, Default)]
struct AudioConfig {
    soundbank: Option<String>,
    midi_port: Option<String>,
}

pub struct Config {
    defaults: DefaultsConfig,
    playback: PlaybackConfig,
    audio: AudioConfig,
}

impl Config {
    /// Embedded defaults overridden by `~/.config/loopeg/config.toml`.
    pub fn load() -> Self {
        Self::load_from(user_config_path().as_deref())
    }

    /// Embedded defaults overridden by the file at `user`, if it exists.
    pub fn load_from(user: Option<&Path>) -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user {
            if path.exists() {
                match std::fs::read_to_string(path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_defaults(&mut base.defaults, user.defaults);
                            merge_playback(&mut base.playback, user.playback);
                            merge_audio(&mut base.audio, user.audio);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            defaults: base.defaults,
            playback: base.playback,
            audio: base.audio,
        }
    }

    /// Settings for new projects, rows and blocks.
    pub fn defaults(&self) -> ProjectDefaults {
        let fallback = ProjectDefaults::default();
        let p = &fallback.pattern;
        ProjectDefaults {
            bpm: self
                .defaults
                .bpm
                .filter(|b| b.is_finite() && *b > 0.0)
                .unwrap_or(fallback.bpm),
            volume: self.defaults.volume.map_or(fallback.volume, |v| v.min(100)),
            pattern: NotePattern {
                rate: self
                    .defaults
                    .rate
                    .filter(|r| RATE_RANGE.contains(r))
                    .unwrap_or(p.rate),
                note_length: self
                    .defaults
                    .note_length
                    .map_or(p.note_length, |l| l.clamp(0.0, 1.0)),
                ground_note: self
                    .defaults
                    .ground_note
                    .map_or(p.ground_note, |n| n.min(MAX_PITCH)),
                velocity: self.defaults.velocity.map_or(p.velocity, |v| v.min(127)),
                ..p.clone()
            },
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        let fallback = SchedulerConfig::default();
        SchedulerConfig {
            quantum: self
                .playback
                .quantum_us
                .map_or(fallback.quantum, |us| Duration::from_micros(us.clamp(100, 100_000))),
            telemetry_interval: self
                .playback
                .telemetry_interval_secs
                .filter(|s| s.is_finite() && *s > 0.0)
                .map_or(fallback.telemetry_interval, Duration::from_secs_f64),
            overrun_budget: self
                .playback
                .overrun_budget_us
                .map_or(fallback.overrun_budget, Duration::from_micros),
            seed: None,
        }
    }

    /// Row limit (clamped to 1..=16, one MIDI channel per row).
    pub fn max_rows(&self) -> usize {
        self.playback
            .max_rows
            .unwrap_or(MIDI_CHANNELS)
            .clamp(1, MIDI_CHANNELS)
    }

    /// Sound bank path with a leading `~/` expanded.
    pub fn soundbank_path(&self) -> Option<PathBuf> {
        self.audio.soundbank.as_deref().map(expand_home)
    }

    pub fn midi_port(&self) -> Option<&str> {
        self.audio.midi_port.as_deref()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("loopeg").join("config.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.volume.is_some() {
        base.volume = user.volume;
    }
    if user.rate.is_some() {
        base.rate = user.rate;
    }
    if user.note_length.is_some() {
        base.note_length = user.note_length;
    }
    if user.ground_note.is_some() {
        base.ground_note = user.ground_note;
    }
    if user.velocity.is_some() {
        base.velocity = user.velocity;
    }
}

fn merge_playback(base: &mut PlaybackConfig, user: PlaybackConfig) {
    if user.quantum_us.is_some() {
        base.quantum_us = user.quantum_us;
    }
    if user.telemetry_interval_secs.is_some() {
        base.telemetry_interval_secs = user.telemetry_interval_secs;
    }
    if user.overrun_budget_us.is_some() {
        base.overrun_budget_us = user.overrun_budget_us;
    }
    if user.max_rows.is_some() {
        base.max_rows = user.max_rows;
    }
}

fn merge_audio(base: &mut AudioConfig, user: AudioConfig) {
    if user.soundbank.is_some() {
        base.soundbank = user.soundbank;
    }
    if user.midi_port.is_some() {
        base.midi_port = user.midi_port;
    }
}
