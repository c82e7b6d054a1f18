//! One playback session: per-row clocks, lookahead batches and the dispatch
//! timeline, advanced by explicit `tick(now)` calls.
//!
//! The scheduler thread drives this with wall-clock seconds since start;
//! tests drive it with simulated time.

use loopeg_types::{read_row, write_row, Arpeggio, RowHandle, SynthEvent};

use crate::backend::{send_event, SynthBackend};
use crate::timeline::{ChannelEvent, Timeline};

/// A block expansion waiting for its row's next deadline.
#[derive(Debug)]
struct PendingBatch {
    block_id: usize,
    arp: Arpeggio,
}

#[derive(Debug)]
struct RowClock {
    handle: RowHandle,
    next_due: f64,
    pending: Option<PendingBatch>,
    was_muted: bool,
    /// Time of the row's latest scheduled event. Later events never go earlier.
    last_time: f64,
    batches: u64,
}

/// What one `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Rows whose batch was handed to the timeline.
    pub rows_due: usize,
    /// Events sent to the backend (including failed ones).
    pub fired: usize,
    pub failed: usize,
    /// Worst lateness, in seconds, among fired events.
    pub max_lateness: f64,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.rows_due == 0 && self.fired == 0
    }
}

pub struct PlaybackSession {
    rows: Vec<RowClock>,
    timeline: Timeline,
    rng: fastrand::Rng,
}

impl PlaybackSession {
    /// Arm every unmuted row at `t0`.
    pub fn new(rows: Vec<RowHandle>, song_bpm: f64, t0: f64, rng: fastrand::Rng) -> Self {
        let mut session = Self {
            rows: rows
                .into_iter()
                .map(|handle| RowClock {
                    handle,
                    next_due: t0,
                    pending: None,
                    was_muted: false,
                    last_time: t0,
                    batches: 0,
                })
                .collect(),
            timeline: Timeline::new(),
            rng,
        };
        for i in 0..session.rows.len() {
            session.arm(i, t0, song_bpm);
        }
        session
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Batches row `index` has dispatched so far.
    pub fn batches_dispatched(&self, index: usize) -> u64 {
        self.rows.get(index).map_or(0, |r| r.batches)
    }

    /// Fetch the row's cursor block as its pending batch, due at `now`.
    ///
    /// The batch is the cursor block itself, so a hold left by removing an
    /// earlier pending block no longer applies.
    fn arm(&mut self, index: usize, now: f64, song_bpm: f64) {
        let clock = &mut self.rows[index];
        let mut row = write_row(&clock.handle);
        clock.was_muted = row.mute;
        if row.mute {
            return;
        }
        row.queue.release_hold();
        clock.pending = row.queue.peek_next(song_bpm, &mut self.rng).map(|arp| PendingBatch {
            block_id: row.queue.cursor(),
            arp,
        });
        clock.next_due = now;
    }

    /// Run one scheduling pass at session time `now` (seconds).
    pub fn tick(&mut self, now: f64, song_bpm: f64, backend: &dyn SynthBackend) -> TickReport {
        let mut report = TickReport::default();

        // Unmuted rows without lookahead (unmuted again, or given their
        // first block) start fresh now.
        for i in 0..self.rows.len() {
            let clock = &mut self.rows[i];
            if clock.pending.is_some() {
                continue;
            }
            let muted = read_row(&clock.handle).mute;
            if muted {
                clock.was_muted = true;
                continue;
            }
            if clock.was_muted {
                log::debug!(target: "playback", "row {} unmuted, re-arming", i);
            }
            self.arm(i, now, song_bpm);
        }

        let mut batch = Vec::new();
        for i in 0..self.rows.len() {
            if self.collect_due(i, now, song_bpm, &mut batch) {
                report.rows_due += 1;
            }
        }
        if !batch.is_empty() {
            self.timeline.schedule(batch);
        }

        for ev in self.timeline.pop_due(now) {
            report.fired += 1;
            report.max_lateness = report.max_lateness.max(now - ev.time);
            if let Err(e) = send_event(backend, ev.channel, &ev.event) {
                report.failed += 1;
                log::warn!(
                    target: "playback",
                    "row {} channel {}: {:?} failed: {}",
                    ev.row,
                    ev.channel,
                    ev.event,
                    e
                );
            }
        }
        report
    }

    /// Move row `index`'s pending batch into `out` if it is due.
    fn collect_due(&mut self, index: usize, now: f64, song_bpm: f64, out: &mut Vec<ChannelEvent>) -> bool {
        let clock = &mut self.rows[index];
        if clock.pending.is_none() || now < clock.next_due {
            return false;
        }

        let mut row = write_row(&clock.handle);
        if row.mute {
            log::debug!(target: "playback", "row {} muted at deadline, going idle", index);
            clock.pending = None;
            clock.was_muted = true;
            return false;
        }
        let Some(pending) = clock.pending.take() else {
            return false;
        };

        let base = clock.next_due;
        let channel = row.channel;
        let lead = [
            SynthEvent::ProgramChange {
                bank: row.instrument.bank,
                program: row.instrument.program,
            },
            SynthEvent::Marker(row.marker(pending.block_id)),
        ];
        let body = pending.arp.events.into_iter().map(|te| {
            let event = match te.event {
                SynthEvent::NoteOn { note, velocity } => SynthEvent::NoteOn {
                    note,
                    velocity: row.scale_velocity(velocity),
                },
                other => other,
            };
            (base + te.time, event)
        });
        let lead = lead.into_iter().map(|event| (base, event));

        for (time, event) in lead.chain(body) {
            let time = time.max(clock.last_time);
            clock.last_time = time;
            out.push(ChannelEvent {
                time,
                row: index,
                channel,
                event,
            });
        }

        clock.next_due = base + pending.arp.duration;
        clock.batches += 1;
        row.queue.advance();
        clock.pending = row
            .queue
            .peek_next(song_bpm, &mut self.rng)
            .map(|arp| PendingBatch {
                block_id: row.queue.cursor(),
                arp,
            });
        true
    }

    /// Earliest time anything needs attention: a row deadline or a queued event.
    pub fn next_deadline(&self) -> Option<f64> {
        self.rows
            .iter()
            .filter(|r| r.pending.is_some())
            .map(|r| r.next_due)
            .chain(self.timeline.next_time())
            .min_by(f64::total_cmp)
    }

    /// Silence everything, drop all lookahead and queued events, then re-arm
    /// unmuted rows at `now` from their current cursor.
    pub fn interrupt(&mut self, now: f64, song_bpm: f64, backend: &dyn SynthBackend) {
        let dropped = self.timeline.clear();
        log::debug!(target: "playback", "interrupt at {:.3}s, dropped {} events", now, dropped);
        if let Err(e) = backend.all_notes_off() {
            log::warn!(target: "playback", "all-notes-off failed: {}", e);
        }
        for i in 0..self.rows.len() {
            let clock = &mut self.rows[i];
            clock.pending = None;
            clock.last_time = now;
            self.arm(i, now, song_bpm);
        }
    }

    /// End the session: drop queued events and release every note.
    pub fn finish(mut self, backend: &dyn SynthBackend) {
        self.timeline.clear();
        for clock in &mut self.rows {
            clock.pending = None;
        }
        if let Err(e) = backend.all_notes_off() {
            log::warn!(target: "playback", "all-notes-off failed: {}", e);
        }
    }
}
