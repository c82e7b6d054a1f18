//! Playback scheduler: owns the scheduler thread for one session at a time.
//!
//! The editor keeps mutating rows through their `RowHandle`s while the
//! thread runs; `stop()` and `interrupt()` are flag writes that the loop
//! picks up within one quantum.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use loopeg_types::RowHandle;
use thiserror::Error;

use crate::backend::SynthBackend;
use crate::session::PlaybackSession;
use crate::telemetry::{DispatchTelemetry, TelemetrySummary};
use crate::tempo::{is_valid_bpm, TempoSource};

/// Feedback messages kept for the editor. When full, telemetry is dropped
/// and lifecycle messages push out the oldest entry.
pub const FEEDBACK_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep granularity when nothing is due.
    pub quantum: Duration,
    /// How often a telemetry summary is sent.
    pub telemetry_interval: Duration,
    /// Lateness above which a dispatch counts as an overrun.
    pub overrun_budget: Duration,
    /// Fixed seed for Random mode, for reproducible sessions.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum: Duration::from_millis(1),
            telemetry_interval: Duration::from_secs(1),
            overrun_budget: Duration::from_millis(5),
            seed: None,
        }
    }
}

/// Messages from the scheduler thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackFeedback {
    Started { rows: usize },
    /// The session ended. `error` is set when it ended on its own.
    Stopped { error: Option<String> },
    Telemetry(TelemetrySummary),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("playback is already running")]
    AlreadyRunning,
    #[error("invalid tempo {0} BPM")]
    InvalidTempo(f64),
    #[error("cannot spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Default)]
struct Control {
    stop: AtomicBool,
    interrupt: AtomicBool,
    running: AtomicBool,
}

pub struct PlaybackScheduler {
    backend: Arc<dyn SynthBackend>,
    config: SchedulerConfig,
    control: Arc<Control>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: Mutex<Option<ThreadId>>,
    feedback_tx: Sender<PlaybackFeedback>,
    feedback_rx: Receiver<PlaybackFeedback>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlaybackScheduler {
    pub fn new(backend: Arc<dyn SynthBackend>, config: SchedulerConfig) -> Self {
        let (feedback_tx, feedback_rx) = crossbeam_channel::bounded(FEEDBACK_CAPACITY);
        Self {
            backend,
            config,
            control: Arc::new(Control::default()),
            worker: Mutex::new(None),
            worker_id: Mutex::new(None),
            feedback_tx,
            feedback_rx,
        }
    }

    pub fn backend(&self) -> &Arc<dyn SynthBackend> {
        &self.backend
    }

    pub fn state(&self) -> SchedulerState {
        if self.control.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Receiver for thread feedback. Clones share one bounded queue.
    pub fn feedback(&self) -> Receiver<PlaybackFeedback> {
        self.feedback_rx.clone()
    }

    /// Start playing `rows` against `tempo` on a new scheduler thread.
    pub fn start(
        &self,
        rows: Vec<RowHandle>,
        tempo: Arc<dyn TempoSource>,
    ) -> Result<(), SchedulerError> {
        let mut worker = lock(&self.worker);
        // Held until the id is recorded, so a stop() from the new thread
        // cannot mistake itself for an outside caller.
        let mut worker_id = lock(&self.worker_id);
        if self.control.running.load(Ordering::Acquire) {
            return Err(SchedulerError::AlreadyRunning);
        }
        // A session that ended on its own still needs joining.
        if let Some(finished) = worker.take() {
            let _ = finished.join();
        }
        let bpm = tempo.bpm();
        if !is_valid_bpm(bpm) {
            return Err(SchedulerError::InvalidTempo(bpm));
        }

        self.control.stop.store(false, Ordering::Release);
        self.control.interrupt.store(false, Ordering::Release);
        self.control.running.store(true, Ordering::Release);

        let thread = SchedulerThread {
            rows,
            tempo,
            backend: Arc::clone(&self.backend),
            control: Arc::clone(&self.control),
            config: self.config.clone(),
            feedback_tx: self.feedback_tx.clone(),
            feedback_rx: self.feedback_rx.clone(),
        };
        let handle = match thread::Builder::new()
            .name("loopeg-playback".into())
            .spawn(move || thread.run())
        {
            Ok(h) => h,
            Err(e) => {
                self.control.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };
        *worker_id = Some(handle.thread().id());
        *worker = Some(handle);
        Ok(())
    }

    /// Stop playback and wait until every note has been released.
    ///
    /// Safe to call repeatedly and from any thread. Called from the
    /// scheduler thread itself (a marker callback) it only raises the flag.
    pub fn stop(&self) {
        if *lock(&self.worker_id) == Some(thread::current().id()) {
            self.control.stop.store(true, Ordering::Release);
            return;
        }
        // Raised under the worker lock: a concurrent start() either finishes
        // first and its thread sees the flag, or runs after the join.
        let mut worker = lock(&self.worker);
        self.control.stop.store(true, Ordering::Release);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                log::error!(target: "playback", "scheduler thread panicked");
                self.control.running.store(false, Ordering::Release);
            }
        }
    }

    /// Silence everything and restart every row from its current block.
    pub fn interrupt(&self) {
        if self.state() == SchedulerState::Running {
            self.control.interrupt.store(true, Ordering::Release);
        }
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SchedulerThread {
    rows: Vec<RowHandle>,
    tempo: Arc<dyn TempoSource>,
    backend: Arc<dyn SynthBackend>,
    control: Arc<Control>,
    config: SchedulerConfig,
    feedback_tx: Sender<PlaybackFeedback>,
    feedback_rx: Receiver<PlaybackFeedback>,
}

/// Deliver a lifecycle message, evicting the oldest one if the editor is
/// not draining.
fn notify(tx: &Sender<PlaybackFeedback>, rx: &Receiver<PlaybackFeedback>, msg: PlaybackFeedback) {
    if let Err(TrySendError::Full(msg)) = tx.try_send(msg) {
        let _ = rx.try_recv();
        let _ = tx.try_send(msg);
    }
}

impl SchedulerThread {
    fn run(self) {
        let backend = &*self.backend;
        let origin = Instant::now();
        let rng = match self.config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut session = PlaybackSession::new(self.rows, self.tempo.bpm(), 0.0, rng);
        let mut telemetry = DispatchTelemetry::new(self.config.overrun_budget);
        let mut last_telemetry_emit = Instant::now();
        let mut error = None;

        log::info!(target: "playback", "session started with {} rows", session.row_count());
        notify(
            &self.feedback_tx,
            &self.feedback_rx,
            PlaybackFeedback::Started {
                rows: session.row_count(),
            },
        );

        while !self.control.stop.load(Ordering::Acquire) {
            let bpm = self.tempo.bpm();
            if !is_valid_bpm(bpm) {
                log::error!(target: "playback", "invalid tempo {}, stopping", bpm);
                error = Some(format!("invalid tempo {} BPM", bpm));
                break;
            }

            let now = origin.elapsed().as_secs_f64();
            if self.control.interrupt.swap(false, Ordering::AcqRel) {
                session.interrupt(now, bpm, backend);
            }

            let report = session.tick(now, bpm, backend);
            if report.fired > 0 {
                telemetry.record_secs(report.max_lateness);
            }

            if last_telemetry_emit.elapsed() >= self.config.telemetry_interval {
                last_telemetry_emit = Instant::now();
                let summary = telemetry.take_summary();
                if self.feedback_tx.try_send(PlaybackFeedback::Telemetry(summary)).is_err() {
                    log::trace!(target: "playback", "feedback queue full, telemetry dropped");
                }
            }

            if report.is_idle() {
                let wait = session
                    .next_deadline()
                    .map(|d| Duration::from_secs_f64((d - now).max(0.0)))
                    .map_or(self.config.quantum, |d| d.min(self.config.quantum));
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }
        }

        session.finish(backend);
        log::info!(target: "playback", "session stopped");
        self.control.running.store(false, Ordering::Release);
        notify(&self.feedback_tx, &self.feedback_rx, PlaybackFeedback::Stopped { error });
    }
}
