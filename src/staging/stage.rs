use std::collections::{HashMap, HashSet};
use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::RemoteStateCache;
use crate::ident::is_valid_workflow_id;
use crate::manifest::{
    normalized_path_key, ManifestEntry, ManifestStore, MatchType, NOTE_SANITIZED_EXISTING_INVALID,
    NOTE_SANITIZED_INVALID_FORMAT, NOTE_STAGED_DUPLICATE_CONFLICT,
};
use crate::snapshot::Snapshot;
use crate::text::{normalize_folder_path, slugify};
use crate::utils::now_iso;
use crate::workflow_file::WorkflowDoc;

use super::{IdPolicy, ScannedFile, StageError};

/// Knobs for a staging run.
#[derive(Debug, Clone, Copy)]
pub struct StageOptions {
    pub policy: IdPolicy,
    /// Accept a name match whose snapshot candidate carries no folder
    /// location. Broadens matching on export-sourced snapshots, at the
    /// cost of occasionally merging same-named workflows.
    pub allow_unanchored_name_match: bool,
}

impl Default for StageOptions {
    fn default() -> Self {
        StageOptions {
            policy: IdPolicy::default(),
            allow_unanchored_name_match: true,
        }
    }
}

/// Per-batch staging counters, reported in the restore summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    pub staged: usize,
    pub skipped: usize,
}

struct IdentityMatch {
    match_type: MatchType,
    existing_id: String,
}

/// Resolve which existing remote workflow, if any, a staged file refers to.
///
/// Signals are tried in strict priority order and the first hit wins: the
/// prior-run manifest (path, then name), the declared id, the instance
/// marker, and finally the name. A name match is only trusted when the
/// candidate's folder location agrees with the computed target, or when the
/// candidate has no location signal at all and the caller allows that.
fn resolve_identity(
    doc: &WorkflowDoc,
    name: &str,
    relative_path: &str,
    normalized_target: &str,
    snapshot: &Snapshot,
    prior: &ManifestStore,
    allow_unanchored: bool,
) -> Option<IdentityMatch> {
    let path_key = normalized_path_key(relative_path);
    if let Some(prev) = prior.prior_by_path(&path_key) {
        if let Some(id) = &prev.id {
            return Some(IdentityMatch {
                match_type: MatchType::Path,
                existing_id: id.clone(),
            });
        }
    }
    if let Some(prev) = prior.prior_by_name_newest(name) {
        if let Some(id) = &prev.id {
            return Some(IdentityMatch {
                match_type: MatchType::NameNewest,
                existing_id: id.clone(),
            });
        }
    }

    if let Some(id) = doc.declared_id() {
        if snapshot.find_by_id(id).is_some() {
            return Some(IdentityMatch {
                match_type: MatchType::Id,
                existing_id: id.to_string(),
            });
        }
    }

    if let Some(marker) = doc.instance_marker() {
        if let Some(row) = snapshot.find_by_marker(marker).first() {
            return Some(IdentityMatch {
                match_type: MatchType::InstanceId,
                existing_id: row.id.clone(),
            });
        }
    }

    let candidates = snapshot.find_by_name(name);
    if candidates.is_empty() {
        return None;
    }
    if let Some(row) = candidates.iter().find(|row| {
        row.relative_path
            .as_deref()
            .is_some_and(|path| normalize_folder_path(path) == normalized_target)
    }) {
        return Some(IdentityMatch {
            match_type: MatchType::Name,
            existing_id: row.id.clone(),
        });
    }
    if allow_unanchored {
        if let Some(row) = candidates.iter().find(|row| row.relative_path.is_none()) {
            warn!(
                workflow = name,
                existing_id = %row.id,
                "Accepting name match without folder agreement"
            );
            return Some(IdentityMatch {
                match_type: MatchType::Name,
                existing_id: row.id.clone(),
            });
        }
    }
    debug!(
        workflow = name,
        "Name candidates exist but their folder locations disagree with the target"
    );
    None
}

/// Stage every scanned file into `staging_dir` and record a manifest entry
/// per file.
///
/// Files that fail to parse are skipped with a warning; the batch
/// continues. Identifier decisions follow the configured [`IdPolicy`], and
/// no two staged files ever carry the same id for different target folders.
pub async fn stage_all(
    files: &[ScannedFile],
    cache: &RemoteStateCache,
    snapshot: &Snapshot,
    prior: &ManifestStore,
    store: &mut ManifestStore,
    staging_dir: &Path,
    opts: &StageOptions,
) -> Result<StageStats, StageError> {
    fs::create_dir_all(staging_dir).await?;

    let mut stats = StageStats::default();
    // Final id to the normalized target that claimed it in this batch.
    let mut claims: HashMap<String, String> = HashMap::new();
    let mut used_names: HashSet<String> = HashSet::new();

    for file in files {
        let mut doc = match WorkflowDoc::load(&file.absolute_path).await {
            Ok(doc) => doc,
            Err(err) => {
                warn!(
                    path = %file.absolute_path.display(),
                    error = %err,
                    "Skipping workflow file that could not be parsed"
                );
                stats.skipped += 1;
                continue;
            }
        };

        let name = doc.name().map(str::to_string).unwrap_or_else(|| {
            Path::new(&file.file_name)
                .file_stem()
                .map_or_else(|| file.file_name.clone(), |s| s.to_string_lossy().to_string())
        });

        // The directory layout alone decides where the workflow belongs.
        let project = match &file.project_segment {
            Some(segment) => segment.clone(),
            None => cache
                .project_display_name(cache.default_project_id())
                .unwrap_or(cache.default_project_id())
                .to_string(),
        };
        let folder_path = file.folder_segments.join("/");
        let target_display = if folder_path.is_empty() {
            project.clone()
        } else {
            format!("{project}/{folder_path}")
        };
        let normalized_target = normalize_folder_path(&target_display);

        let original_id = doc.declared_id().map(str::to_string);
        let mut notes: Vec<&str> = Vec::new();
        if let Some(id) = &original_id {
            if !is_valid_workflow_id(id) {
                warn!(workflow = %name, id = %id, "Declared id has an invalid format; clearing");
                doc.clear_id();
                notes.push(NOTE_SANITIZED_INVALID_FORMAT);
            }
        }

        let matched = resolve_identity(
            &doc,
            &name,
            &file.relative_path,
            &normalized_target,
            snapshot,
            prior,
            opts.allow_unanchored_name_match,
        );
        let match_type = matched.as_ref().map_or(MatchType::None, |m| m.match_type);
        let existing_id = matched.as_ref().map(|m| m.existing_id.clone());

        match opts.policy {
            IdPolicy::NeverOverwrite => {
                // Imports must only ever create. The match is still
                // recorded so the decision can be audited.
                if doc.declared_id().is_some() {
                    doc.clear_id();
                    notes.push("cleared-by-policy");
                }
            }
            IdPolicy::PreserveAll => {
                if let Some(m) = &matched {
                    if is_valid_workflow_id(&m.existing_id) {
                        if doc.declared_id() != Some(m.existing_id.as_str()) {
                            doc.set_id(&m.existing_id);
                            notes.push("aligned-to-existing");
                        }
                    } else {
                        warn!(
                            workflow = %name,
                            existing_id = %m.existing_id,
                            "Matched workflow id has an invalid format; clearing"
                        );
                        doc.clear_id();
                        notes.push(NOTE_SANITIZED_EXISTING_INVALID);
                    }
                }
            }
            IdPolicy::Reconcile => {
                if let Some(m) = &matched {
                    if !is_valid_workflow_id(&m.existing_id) {
                        warn!(
                            workflow = %name,
                            existing_id = %m.existing_id,
                            "Matched workflow id has an invalid format; keeping the declared id"
                        );
                        notes.push(NOTE_SANITIZED_EXISTING_INVALID);
                    } else if claims
                        .get(&m.existing_id)
                        .is_some_and(|target| target != &normalized_target)
                    {
                        // Clearing beats guessing which of the two files
                        // owns the id.
                        doc.clear_id();
                        notes.push(NOTE_STAGED_DUPLICATE_CONFLICT);
                    } else if doc.declared_id() != Some(m.existing_id.as_str()) {
                        doc.set_id(&m.existing_id);
                        notes.push("aligned-to-existing");
                    }
                }
            }
        }

        // Only one remote object can own an id. The first file targeting a
        // folder claims it; a second file with the same id and a different
        // target is cleared.
        if opts.policy != IdPolicy::NeverOverwrite {
            if let Some(id) = doc.declared_id().map(str::to_string) {
                match claims.get(&id) {
                    Some(target) if target != &normalized_target => {
                        warn!(
                            workflow = %name,
                            id = %id,
                            other_target = %target,
                            "Id already claimed by another staged file; clearing"
                        );
                        doc.clear_id();
                        if !notes.contains(&NOTE_STAGED_DUPLICATE_CONFLICT) {
                            notes.push(NOTE_STAGED_DUPLICATE_CONFLICT);
                        }
                    }
                    _ => {
                        claims.insert(id, normalized_target.clone());
                    }
                }
            }
        }

        let stem = Path::new(&file.file_name)
            .file_stem()
            .map_or_else(|| file.file_name.clone(), |s| s.to_string_lossy().to_string());
        let mut slug = slugify(&stem);
        if slug.is_empty() {
            slug = "workflow".to_string();
        }
        let mut staged_name = format!("{slug}.json");
        let mut counter = 2;
        while !used_names.insert(staged_name.clone()) {
            staged_name = format!("{slug}-{counter}.json");
            counter += 1;
        }

        let staged_path = staging_dir.join(&staged_name);
        fs::write(&staged_path, doc.to_json_string()?).await?;

        let note = if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        };
        let entry = ManifestEntry {
            file_name: staged_name,
            id: doc.declared_id().map(str::to_string),
            original_id,
            match_type,
            existing_id,
            name,
            project,
            folder_path,
            source_path: file.relative_path.clone(),
            note,
            updated_at: now_iso(),
        };
        debug!(
            file = %entry.file_name,
            match_type = ?entry.match_type,
            id = entry.id.as_deref().unwrap_or("-"),
            "Staged workflow"
        );
        store.upsert(entry);
        stats.staged += 1;
    }

    info!(
        staged = stats.staged,
        skipped = stats.skipped,
        "Staging complete"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
