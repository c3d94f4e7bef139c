//! Seam to the workflow engine's own export/import commands.
//!
//! The engine CLI (`n8n` by default, possibly wrapped in `docker exec` or
//! similar) is treated as opaque: flowvault only relies on its exit status,
//! its stderr text, and the files it reads or writes. No reconciliation
//! logic lives here.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine command is empty")]
    EmptyCommand,

    #[error("Engine command '{0}' not found on PATH")]
    CommandNotFound(String),

    #[error("Failed to execute engine command: {0}")]
    CommandError(String),

    #[error("Engine command failed (exit {code}): {stderr}")]
    Failed { code: i32, stderr: String },
}

/// Export/import operations provided by the workflow engine itself.
#[async_trait]
pub trait EngineCommands: Send + Sync {
    /// Export every workflow into `dest_file` as one JSON array.
    async fn export_workflows(&self, dest_file: &Path) -> Result<(), EngineError>;

    /// Export every workflow as one file per workflow into `dest_dir`.
    async fn export_workflows_separate(&self, dest_dir: &Path) -> Result<(), EngineError>;

    /// Import workflows from a single file or from a directory of files.
    async fn import_workflows(&self, source: &Path) -> Result<(), EngineError>;

    /// Export credentials in their stored (encrypted) form.
    async fn export_credentials(&self, dest_file: &Path) -> Result<(), EngineError>;

    /// Import credentials previously exported by [`export_credentials`].
    ///
    /// [`export_credentials`]: EngineCommands::export_credentials
    async fn import_credentials(&self, source: &Path) -> Result<(), EngineError>;
}

/// Production [`EngineCommands`] that spawns the configured command line.
#[derive(Debug, Clone)]
pub struct EngineCli {
    program: String,
    base_args: Vec<String>,
}

impl EngineCli {
    /// Build from the configured command vector, e.g. `["n8n"]` or
    /// `["docker", "exec", "-i", "n8n", "n8n"]`. The first element must
    /// resolve on PATH.
    pub fn new(command: &[String]) -> Result<Self, EngineError> {
        let (program, base_args) = command.split_first().ok_or(EngineError::EmptyCommand)?;
        which::which(program).map_err(|_| EngineError::CommandNotFound(program.clone()))?;
        Ok(EngineCli {
            program: program.clone(),
            base_args: base_args.to_vec(),
        })
    }

    async fn run(&self, args: &[String]) -> Result<(), EngineError> {
        debug!(
            "Running engine command: {} {} {}",
            self.program,
            self.base_args.join(" "),
            args.join(" ")
        );
        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .output()
            .await
            .map_err(|e| EngineError::CommandError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl EngineCommands for EngineCli {
    async fn export_workflows(&self, dest_file: &Path) -> Result<(), EngineError> {
        self.run(&[
            "export:workflow".to_string(),
            "--all".to_string(),
            format!("--output={}", dest_file.display()),
        ])
        .await
    }

    async fn export_workflows_separate(&self, dest_dir: &Path) -> Result<(), EngineError> {
        self.run(&[
            "export:workflow".to_string(),
            "--all".to_string(),
            "--separate".to_string(),
            format!("--output={}", dest_dir.display()),
        ])
        .await
    }

    async fn import_workflows(&self, source: &Path) -> Result<(), EngineError> {
        let mut args = vec!["import:workflow".to_string()];
        if source.is_dir() {
            args.push("--separate".to_string());
        }
        args.push(format!("--input={}", source.display()));
        self.run(&args).await
    }

    async fn export_credentials(&self, dest_file: &Path) -> Result<(), EngineError> {
        self.run(&[
            "export:credentials".to_string(),
            "--all".to_string(),
            format!("--output={}", dest_file.display()),
        ])
        .await
    }

    async fn import_credentials(&self, source: &Path) -> Result<(), EngineError> {
        self.run(&[
            "import:credentials".to_string(),
            format!("--input={}", source.display()),
        ])
        .await
    }
}
