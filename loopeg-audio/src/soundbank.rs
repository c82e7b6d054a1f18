//! SoundFont 2 preset directory.
//!
//! Only the preset headers are read (`LIST pdta` / `phdr`): enough to offer
//! and validate bank/program selections for the external synthesizer that
//! actually loads the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PHDR_RECORD_LEN: usize = 38;
const PRESET_NAME_LEN: usize = 20;
const TERMINAL_PRESET: &str = "EOP";

#[derive(Debug, Error)]
pub enum SoundBankError {
    #[error("cannot read sound bank {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a usable SoundFont 2 file: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub bank: u16,
    pub program: u16,
}

#[derive(Debug, Clone)]
pub struct SoundBank {
    path: PathBuf,
    presets: Vec<Preset>,
}

impl SoundBank {
    pub fn load(path: &Path) -> Result<Self, SoundBankError> {
        let bytes = fs::read(path).map_err(|source| SoundBankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let presets = parse_presets(&bytes).map_err(|reason| SoundBankError::Malformed {
            path: path.to_path_buf(),
            reason,
        })?;
        log::info!(
            target: "soundbank",
            "loaded {} presets from {}",
            presets.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            presets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Presets sorted by (bank, program).
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn find(&self, bank: u16, program: u8) -> Option<&Preset> {
        self.presets
            .binary_search_by(|p| (p.bank, p.program).cmp(&(bank, program as u16)))
            .ok()
            .map(|i| &self.presets[i])
    }

    pub fn has_preset(&self, bank: u16, program: u8) -> bool {
        self.find(bank, program).is_some()
    }
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Iterate `(id, body)` over a run of RIFF chunks.
fn chunks(mut data: &[u8]) -> impl Iterator<Item = Result<(&[u8], &[u8]), String>> {
    std::iter::from_fn(move || {
        if data.is_empty() {
            return None;
        }
        if data.len() < 8 {
            data = &[];
            return Some(Err("truncated chunk header".to_string()));
        }
        let id = &data[..4];
        let len = read_u32(data, 4) as usize;
        let Some(body) = data.get(8..8 + len) else {
            data = &[];
            return Some(Err(format!(
                "chunk {} overruns the file",
                String::from_utf8_lossy(id)
            )));
        };
        // Chunks are word aligned.
        let next = (8 + len + (len & 1)).min(data.len());
        data = &data[next..];
        Some(Ok((id, body)))
    })
}

fn parse_presets(bytes: &[u8]) -> Result<Vec<Preset>, String> {
    if bytes.len() < 12 || &bytes[..4] != b"RIFF" || &bytes[8..12] != b"sfbk" {
        return Err("missing RIFF sfbk header".to_string());
    }
    let riff_len = read_u32(bytes, 4) as usize;
    let end = (8 + riff_len).min(bytes.len());

    for chunk in chunks(&bytes[12..end]) {
        let (id, body) = chunk?;
        if id != b"LIST" || body.get(..4) != Some(b"pdta".as_slice()) {
            continue;
        }
        for sub in chunks(&body[4..]) {
            let (sub_id, sub_body) = sub?;
            if sub_id == b"phdr" {
                return parse_phdr(sub_body);
            }
        }
        return Err("pdta list has no phdr chunk".to_string());
    }
    Err("no pdta list".to_string())
}

fn parse_phdr(data: &[u8]) -> Result<Vec<Preset>, String> {
    if data.len() % PHDR_RECORD_LEN != 0 {
        return Err(format!(
            "phdr length {} is not a multiple of {}",
            data.len(),
            PHDR_RECORD_LEN
        ));
    }
    let mut presets: Vec<Preset> = data
        .chunks_exact(PHDR_RECORD_LEN)
        .map(|rec| {
            let raw_name = &rec[..PRESET_NAME_LEN];
            let name_end = raw_name.iter().position(|&b| b == 0).unwrap_or(PRESET_NAME_LEN);
            Preset {
                name: String::from_utf8_lossy(&raw_name[..name_end]).trim().to_string(),
                program: read_u16(rec, 20),
                bank: read_u16(rec, 22),
            }
        })
        .filter(|p| p.name != TERMINAL_PRESET)
        .collect();
    if presets.is_empty() {
        return Err("no presets".to_string());
    }
    presets.sort_by_key(|p| (p.bank, p.program));
    Ok(presets)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    /// Minimal SF2 image with the given `(name, bank, program)` presets.
    pub(crate) fn sf2_bytes(presets: &[(&str, u16, u16)]) -> Vec<u8> {
        let mut phdr = Vec::new();
        let terminal = [(TERMINAL_PRESET, 0u16, 0u16)];
        for (name, bank, program) in presets.iter().chain(terminal.iter()) {
            let mut rec = [0u8; PHDR_RECORD_LEN];
            rec[..name.len()].copy_from_slice(name.as_bytes());
            rec[20..22].copy_from_slice(&program.to_le_bytes());
            rec[22..24].copy_from_slice(&bank.to_le_bytes());
            phdr.extend_from_slice(&rec);
        }

        let mut info = b"INFO".to_vec();
        info.extend(chunk(b"ifil", &[2, 0, 1, 0]));
        let mut pdta = b"pdta".to_vec();
        pdta.extend(chunk(b"phdr", &phdr));
        pdta.extend(chunk(b"pbag", &[0; 4]));

        let mut body = b"sfbk".to_vec();
        body.extend(chunk(b"LIST", &info));
        body.extend(chunk(b"LIST", &b"sdta".to_vec()));
        body.extend(chunk(b"LIST", &pdta));
        chunk(b"RIFF", &body)
    }

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn presets_sorted_without_terminal() {
        let file = write_temp(&sf2_bytes(&[
            ("Strings", 0, 48),
            ("Piano", 0, 0),
            ("Drums", 128, 0),
        ]));
        let bank = SoundBank::load(file.path()).unwrap();
        let names: Vec<&str> = bank.presets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Piano", "Strings", "Drums"]);
        assert!(bank.has_preset(0, 48));
        assert!(bank.has_preset(128, 0));
        assert!(!bank.has_preset(0, 1));
        assert_eq!(bank.find(0, 0).map(|p| p.name.as_str()), Some("Piano"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SoundBank::load(Path::new("/nonexistent/bank.sf2")).unwrap_err();
        assert!(matches!(err, SoundBankError::Io { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        let file = write_temp(b"definitely not a soundfont");
        let err = SoundBank::load(file.path()).unwrap_err();
        assert!(matches!(err, SoundBankError::Malformed { .. }));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = sf2_bytes(&[("Piano", 0, 0)]);
        let file = write_temp(&bytes[..bytes.len() - 30]);
        assert!(matches!(
            SoundBank::load(file.path()),
            Err(SoundBankError::Malformed { .. })
        ));
    }

    #[test]
    fn bank_without_presets_is_rejected() {
        let file = write_temp(&sf2_bytes(&[]));
        assert!(SoundBank::load(file.path()).is_err());
    }
}
