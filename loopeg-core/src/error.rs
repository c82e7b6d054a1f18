use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed project JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A field holds a value playback cannot use. `path` names the field,
    /// e.g. `instruments[0].arpeggiators[2].variants`.
    #[error("invalid {path}: {reason}")]
    Invalid { path: String, reason: String },
    #[error("a project holds at most {0} rows")]
    TooManyRows(usize),
    #[error("invalid tempo {0} BPM")]
    InvalidTempo(f64),
}

impl ProjectError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ProjectError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
