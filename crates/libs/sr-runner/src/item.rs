//! Values exchanged with the run manager.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::toolchain::extension_of;

/// Script record as provided by the storage collaborator.
///
/// The extension of `name` picks the toolchain. `file_path` is not checked
/// upfront; a missing file surfaces as a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptItem {
    pub id: String,
    pub name: String,
    pub file_path: PathBuf,
}

impl ScriptItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_path: file_path.into(),
        }
    }

    /// Extension of the display name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        extension_of(&self.name)
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// True iff the process exited with code 0 and was not signalled.
    pub ok: bool,
    /// Exit code; absent when the process was signalled or never spawned.
    #[serde(rename = "code")]
    pub exit_code: Option<i32>,
    /// Signal that terminated the process.
    pub signal: Option<i32>,
    /// Everything the process wrote to stdout.
    pub stdout: String,
    /// Everything the process wrote to stderr, plus spawn errors.
    pub stderr: String,
    /// Remediation hints, empty on success.
    pub suggestions: Vec<String>,
}
