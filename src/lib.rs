// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing
    )
)]

pub mod api;
pub mod backup;
pub mod cache;
pub mod config;
pub mod engine;
pub mod foldersync;
pub mod git;
pub mod ident;
pub mod logging;
pub mod manifest;
pub mod reconcile;
pub mod restore;
pub mod snapshot;
pub mod staging;
pub mod text;
pub mod utils;
pub mod workflow_file;

// Re-export commonly used types
pub use api::{
    ApiError, Folder, HttpRemoteApi, Project, ProjectKind, RemoteApi, RemoteWorkflow,
};
pub use backup::{run_backup, BackupError, BackupOptions, BackupSummary};
pub use cache::{CacheError, RemoteStateCache, WorkflowLocation};
pub use config::{
    load_config, ApiConfig, BackupConfig, ConfigError, EngineConfig, RestoreConfig, StorageMode,
    UserConfig,
};
pub use engine::{EngineCli, EngineCommands, EngineError};
pub use foldersync::{sync_folders, SyncOutcome};
pub use ident::{is_valid_workflow_id, WORKFLOW_ID_LEN};
pub use manifest::{ManifestEntry, ManifestError, ManifestStore, MatchType};
pub use reconcile::{reconcile, ReconcileOutcome};
pub use restore::{run_restore, RestoreError, RestoreOptions, RestoreSummary};
pub use snapshot::{Snapshot, SnapshotError, SnapshotRow, SnapshotSource};
pub use staging::{
    scan_backup_root, stage_all, IdPolicy, ScannedFile, StageError, StageOptions, StageStats,
};
pub use workflow_file::{WorkflowDoc, WorkflowFileError};
