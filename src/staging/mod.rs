//! Staging Normalizer: turns on-disk workflow files into import-ready
//! staged copies plus manifest entries.
//!
//! For every file this resolves where the workflow belongs (purely from its
//! directory location), whether it is an existing remote workflow or a new
//! one, and what id the staged copy should carry. The rules live in
//! [`stage`]; directory scanning lives in [`scan`].

mod scan;
mod stage;

pub use scan::{scan_backup_root, ScannedFile};
pub use stage::{stage_all, StageOptions, StageStats};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// What staging is allowed to do with workflow identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum IdPolicy {
    /// Match staged files to existing workflows and keep their ids stable.
    #[default]
    Reconcile,
    /// Force matched ids onto staged files, keeping declared ids otherwise.
    PreserveAll,
    /// Strip every id so the import only ever creates new workflows.
    NeverOverwrite,
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Failed to scan backup root {root}: {source}")]
    Scan {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Backup root {0} does not exist")]
    MissingRoot(PathBuf),

    #[error("Failed to write staged file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize staged workflow: {0}")]
    Serialize(#[from] serde_json::Error),
}
