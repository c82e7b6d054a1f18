//! MIDI output backend: drives an external SoundFont synthesizer through midir.

use std::sync::{Mutex, PoisonError};

use midir::{MidiOutput, MidiOutputConnection};
use loopeg_types::MIDI_CHANNELS;

use crate::backend::{BackendError, BackendResult, SynthBackend};
use crate::soundbank::SoundBank;

const CLIENT_NAME: &str = "loopeg";

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;

const CC_BANK_MSB: u8 = 0;
const CC_BANK_LSB: u8 = 32;
const CC_ALL_NOTES_OFF: u8 = 123;

type MarkerCallback = Box<dyn Fn(&str) + Send + Sync>;

pub struct MidiBackend {
    conn: Mutex<MidiOutputConnection>,
    port_name: String,
    soundbank: SoundBank,
    on_marker: Option<MarkerCallback>,
}

/// Names of the MIDI output ports currently available.
pub fn list_ports() -> BackendResult<Vec<String>> {
    let out = MidiOutput::new(CLIENT_NAME).map_err(|e| BackendError(e.to_string()))?;
    Ok(out
        .ports()
        .iter()
        .filter_map(|p| out.port_name(p).ok())
        .collect())
}

impl MidiBackend {
    /// Connect to the first output port whose name contains `port_hint`
    /// (case-insensitive), or the first port when no hint is given.
    pub fn connect(port_hint: Option<&str>, soundbank: SoundBank) -> BackendResult<Self> {
        let out = MidiOutput::new(CLIENT_NAME).map_err(|e| BackendError(e.to_string()))?;
        let ports = out.ports();
        let hint = port_hint.map(str::to_lowercase);
        let (port, port_name) = ports
            .iter()
            .filter_map(|p| out.port_name(p).ok().map(|name| (p, name)))
            .find(|(_, name)| match &hint {
                Some(h) => name.to_lowercase().contains(h.as_str()),
                None => true,
            })
            .ok_or_else(|| match port_hint {
                Some(h) => BackendError(format!("no MIDI output port matching '{}'", h)),
                None => BackendError("no MIDI output ports available".to_string()),
            })?;
        let port = port.clone();

        let conn = out
            .connect(&port, "loopeg-out")
            .map_err(|e| BackendError(format!("connect to {}: {}", port_name, e)))?;
        log::info!(
            target: "backend",
            "connected to MIDI port '{}' using {}",
            port_name,
            soundbank.path().display()
        );
        Ok(Self {
            conn: Mutex::new(conn),
            port_name,
            soundbank,
            on_marker: None,
        })
    }

    /// Receive `"row#block"` markers as blocks start playing.
    pub fn with_marker_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_marker = Some(Box::new(f));
        self
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn soundbank(&self) -> &SoundBank {
        &self.soundbank
    }

    fn send(&self, bytes: &[u8]) -> BackendResult {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.send(bytes).map_err(|e| BackendError(e.to_string()))
    }
}

fn status(kind: u8, channel: u8) -> BackendResult<u8> {
    if channel as usize >= MIDI_CHANNELS {
        return Err(BackendError(format!("channel {} out of range", channel)));
    }
    Ok(kind | channel)
}

fn data_byte(what: &str, value: u8) -> BackendResult<u8> {
    if value > 0x7F {
        return Err(BackendError(format!("{} {} out of range", what, value)));
    }
    Ok(value)
}

impl SynthBackend for MidiBackend {
    fn select_program(&self, channel: u8, bank: u16, program: u8) -> BackendResult {
        if !self.soundbank.has_preset(bank, program) {
            return Err(BackendError(format!(
                "no preset {}:{} in {}",
                bank,
                program,
                self.soundbank.path().display()
            )));
        }
        let cc = status(CONTROL_CHANGE, channel)?;
        self.send(&[cc, CC_BANK_MSB, ((bank >> 7) & 0x7F) as u8])?;
        self.send(&[cc, CC_BANK_LSB, (bank & 0x7F) as u8])?;
        self.send(&[status(PROGRAM_CHANGE, channel)?, data_byte("program", program)?])
    }

    fn note_on(&self, channel: u8, note: u8, velocity: u8) -> BackendResult {
        self.send(&[
            status(NOTE_ON, channel)?,
            data_byte("note", note)?,
            data_byte("velocity", velocity)?,
        ])
    }

    fn note_off(&self, channel: u8, note: u8) -> BackendResult {
        self.send(&[status(NOTE_OFF, channel)?, data_byte("note", note)?, 0])
    }

    fn control_change(&self, channel: u8, controller: u8, value: u8) -> BackendResult {
        self.send(&[
            status(CONTROL_CHANGE, channel)?,
            data_byte("controller", controller)?,
            data_byte("value", value)?,
        ])
    }

    fn all_notes_off(&self) -> BackendResult {
        // Explicit note-offs reach synths that ignore CC 123.
        let mut first_err = None;
        for channel in 0..MIDI_CHANNELS as u8 {
            for note in 0..=0x7F {
                if let Err(e) = self.note_off(channel, note) {
                    first_err.get_or_insert(e);
                }
            }
            if let Err(e) = self.control_change(channel, CC_ALL_NOTES_OFF, 0) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn marker(&self, block: &str) -> BackendResult {
        log::debug!(target: "backend", "block {} started", block);
        if let Some(cb) = &self.on_marker {
            cb(block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bytes() {
        assert_eq!(status(NOTE_ON, 0).unwrap(), 0x90);
        assert_eq!(status(PROGRAM_CHANGE, 15).unwrap(), 0xCF);
        assert!(status(NOTE_OFF, 16).is_err());
    }

    #[test]
    fn data_bytes_are_seven_bit() {
        assert_eq!(data_byte("note", 127).unwrap(), 127);
        assert!(data_byte("note", 128).is_err());
    }
}
