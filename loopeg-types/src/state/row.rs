use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use super::track_queue::TrackQueue;

/// Sound bank preset a row plays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instrument {
    pub program: u8,
    pub bank: u16,
}

/// One independently clocked lane of blocks on its own MIDI channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// MIDI channel, equal to the row's position in the project.
    pub channel: u8,
    pub mute: bool,
    /// Row volume in percent, 0..=100. Scales every note velocity.
    pub volume: u8,
    pub instrument: Instrument,
    pub queue: TrackQueue,
}

/// Shared handle: the editor writes through it, the scheduler reads.
pub type RowHandle = Arc<RwLock<Row>>;

impl Row {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            mute: false,
            volume: 64,
            instrument: Instrument::default(),
            queue: TrackQueue::new(),
        }
    }

    pub fn into_handle(self) -> RowHandle {
        Arc::new(RwLock::new(self))
    }

    /// Marker text announcing that block `block_id` of this row started.
    pub fn marker(&self, block_id: usize) -> String {
        format!("{}#{}", self.channel, block_id)
    }

    /// Apply the row volume to a note velocity.
    pub fn scale_velocity(&self, velocity: u8) -> u8 {
        let scaled = velocity as f64 * self.volume as f64 / 100.0;
        scaled.round().clamp(0.0, 127.0) as u8
    }
}

/// Read-lock a row. A writer that panicked leaves plain data behind, so a
/// poisoned lock is still readable.
pub fn read_row(handle: &RowHandle) -> RwLockReadGuard<'_, Row> {
    handle.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_row(handle: &RowHandle) -> RwLockWriteGuard<'_, Row> {
    handle.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
