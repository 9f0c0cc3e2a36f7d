//! YAML snapshot of the console's data.
//!
//! The engine keeps everything in memory; between CLI invocations the doctors and summarizers
//! live in one YAML file:
//!
//! ```yaml
//! doctors:
//!   - id: D1
//!     name: Dr Alice Moreno
//!     ehr: Epic
//!     practice: Northside
//! summarizers:
//!   - id: S1
//!     doctorId: D1
//!     doctorName: Dr Alice Moreno
//!     name: Discharge letters
//!     ehr: Epic
//!     selectedResource: epic-folder-7
//!     active: true
//! ```

use console_core::{Doctor, Summarizer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write snapshot file: {0}")]
    FileWrite(std::io::Error),
    #[error("snapshot schema mismatch at {path}: {source}")]
    Schema {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialization(serde_yaml::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub summarizers: Vec<Summarizer>,
}

impl Snapshot {
    /// Parse a snapshot from YAML text, reporting the path of the first field that does not
    /// match the schema (e.g. `summarizers[2].doctorId`).
    pub fn parse(yaml_text: &str) -> Result<Self, SnapshotError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        serde_path_to_error::deserialize(deserializer).map_err(|err| {
            let path = err.path().to_string();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            SnapshotError::Schema {
                path,
                source: err.into_inner(),
            }
        })
    }

    pub fn render(&self) -> Result<String, SnapshotError> {
        serde_yaml::to_string(self).map_err(SnapshotError::Serialization)
    }

    /// Load the snapshot at `path`. A missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::default()),
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "snapshot file not found, starting empty");
                Ok(Self::default())
            }
            Err(e) => Err(SnapshotError::FileRead(e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let text = self.render()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SnapshotError::FileWrite)?;
        }
        fs::write(path, text).map_err(SnapshotError::FileWrite)
    }
}
