//! Git storage adapter.
//!
//! Used only when the backup storage mode is `remote`: the backup root is a
//! git work tree, and after writing the tree is staged, committed, and
//! pushed. Everything shells out to `git`; nothing here inspects history.

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Backup root is not a git repository")]
    NotGitRepository,

    #[error("Failed to execute git command: {0}")]
    CommandError(String),

    #[error("git {action} failed: {stderr}")]
    OperationFailed { action: String, stderr: String },
}

fn run_git(root: &Path, args: &[&str]) -> Result<std::process::Output, GitError> {
    Command::new("git")
        .args(args)
        .current_dir(root)
        // Clear GIT_DIR to avoid being affected by git hooks environment
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .output()
        .map_err(|e| GitError::CommandError(e.to_string()))
}

fn run_checked(root: &Path, args: &[&str], action: &str) -> Result<(), GitError> {
    let output = run_git(root, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not a git repository") {
            return Err(GitError::NotGitRepository);
        }
        return Err(GitError::OperationFailed {
            action: action.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Check if the backup root is inside a git repository.
#[must_use]
pub fn is_git_repository(root: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(root)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Whether the work tree has anything to commit.
pub fn has_changes(root: &Path) -> Result<bool, GitError> {
    let output = run_git(root, &["status", "--porcelain"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not a git repository") {
            return Err(GitError::NotGitRepository);
        }
        return Err(GitError::OperationFailed {
            action: "status".to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
}

/// Stage everything under the backup root and commit it.
pub fn commit_all(root: &Path, message: &str) -> Result<(), GitError> {
    debug!("Committing backup changes in {}", root.display());
    run_checked(root, &["add", "-A"], "add")?;
    run_checked(root, &["commit", "-m", message], "commit")
}

/// Push the current branch to the configured remote.
pub fn push(root: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
    debug!("Pushing backup to {remote}/{branch}");
    run_checked(root, &["push", remote, branch], "push")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_git_directory() {
        // Use root directory which is definitely not inside a git repository
        // (git won't traverse above /)
        let non_git = Path::new("/");
        assert!(!is_git_repository(non_git));
    }

    #[test]
    fn test_has_changes_outside_repo_errors() {
        let non_git = Path::new("/");
        assert!(has_changes(non_git).is_err());
    }
}
