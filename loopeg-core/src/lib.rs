//! # loopeg-core
//!
//! Project layer for the loopeg arpeggio looper: the editable project model,
//! configuration, and JSON save/load. Playback itself lives in loopeg-audio;
//! this crate hands it row handles and a shared tempo.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loopeg_core::config::Config;
//! use loopeg_core::persistence::load_project;
//! use loopeg_audio::{MidiBackend, PlaybackScheduler, SoundBank};
//!
//! let config = Config::load();
//! let project = load_project(path, config.defaults(), config.max_rows())?;
//!
//! let bank = SoundBank::load(&soundbank_path)?;
//! let backend = Arc::new(MidiBackend::connect(config.midi_port(), bank)?);
//! let scheduler = PlaybackScheduler::new(backend, config.scheduler());
//! scheduler.start(project.rows().to_vec(), Arc::new(project.tempo()))?;
//!
//! // Edit rows through their handles while playing.
//! project.edit_row(0, |row| row.mute = true);
//! scheduler.stop();
//! ```
//!
//! ## Module Overview
//!
//! - [`project`]: `Project`: rows in channel order, song tempo, loop length
//! - [`persistence`]: JSON project files with field-level validation
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`error`]: `ProjectError`

pub mod config;
pub mod error;
pub mod persistence;
pub mod project;

pub use config::Config;
pub use error::ProjectError;
pub use persistence::{decode_project, encode_project, load_project, save_project};
pub use project::{Project, ProjectDefaults};
