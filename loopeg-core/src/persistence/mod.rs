//! JSON project files.

pub mod load;
pub mod save;
pub mod schema;

use std::path::Path;

pub use load::decode_project;

use crate::error::ProjectError;
use crate::project::{Project, ProjectDefaults};

/// Serialize a project as pretty-printed JSON.
pub fn encode_project(project: &Project) -> Result<String, ProjectError> {
    Ok(serde_json::to_string_pretty(&save::project_to_file(project))?)
}

/// Write `project` to `path`, creating parent directories.
///
/// The JSON goes to a sibling temp file first and is renamed into place,
/// so a failed save leaves the previous file intact.
pub fn save_project(path: &Path, project: &Project) -> Result<(), ProjectError> {
    let json = encode_project(project)?;
    let io_err = |source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    log::info!(target: "persistence", "saved {} rows to {}", project.row_count(), path.display());
    Ok(())
}

/// Read and validate the project at `path`.
pub fn load_project(
    path: &Path,
    defaults: ProjectDefaults,
    max_rows: usize,
) -> Result<Project, ProjectError> {
    let json = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let project = decode_project(&json, defaults, max_rows)?;
    log::info!(target: "persistence", "loaded {} rows from {}", project.row_count(), path.display());
    Ok(project)
}
