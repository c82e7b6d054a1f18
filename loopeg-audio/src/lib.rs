pub mod backend;
pub mod midi_backend;
pub mod scheduler;
pub mod session;
pub mod soundbank;
pub mod telemetry;
pub mod tempo;
pub mod timeline;

pub use backend::{audition, BackendError, BackendResult, NullBackend, SynthBackend, TestBackend, TestOp};
pub use midi_backend::MidiBackend;
pub use scheduler::{PlaybackFeedback, FEEDBACK_CAPACITY, PlaybackScheduler, SchedulerConfig, SchedulerError, SchedulerState};
pub use soundbank::{Preset, SoundBank, SoundBankError};
pub use telemetry::TelemetrySummary;
pub use tempo::{SharedTempo, TempoSource};
