//! Post-import reconciliation: discover what the import actually did.
//!
//! The import command may reject or regenerate identifiers that staging
//! trusted. Diffing the pre and post snapshots yields the ids the remote
//! really assigned; manifest entries are re-matched by name and target path
//! and the actual id is written back, so the manifest carries remote truth
//! into folder sync and into the next run's matching.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::manifest::{ManifestEntry, ManifestStore};
use crate::snapshot::{Snapshot, SnapshotRow};
use crate::text::normalize_folder_path;
use crate::utils::now_iso;

/// Counts derived from the pre/post snapshot diff, for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

fn path_agrees(row: &SnapshotRow, normalized_target: &str) -> bool {
    row.relative_path
        .as_deref()
        .is_some_and(|path| normalize_folder_path(path) == normalized_target)
}

fn push_note(entry: &mut ManifestEntry, note: &str) {
    match &mut entry.note {
        Some(existing) => {
            existing.push_str("; ");
            existing.push_str(note);
        }
        None => entry.note = Some(note.to_string()),
    }
}

/// Update every manifest entry with the id the remote actually assigned.
///
/// Entries whose staged id survived the import are left alone. The rest are
/// matched against post-import rows by name: first a created row at the
/// entry's target location, then any created row, then a pre-existing row at
/// the target. Each post-import id is assigned to at most one entry; when
/// several rows were in the running, the basis of the pick is appended to
/// the entry's note so the choice can be audited later.
pub fn reconcile(pre: &Snapshot, post: &Snapshot, store: &mut ManifestStore) -> ReconcileOutcome {
    let pre_ids = pre.ids();
    let post_ids = post.ids();
    let created_ids: HashSet<&str> = post_ids.difference(&pre_ids).copied().collect();
    let deleted = pre_ids.difference(&post_ids).count();

    // Ids already accounted for, so no two entries resolve to the same row.
    let mut claimed: HashSet<String> = store
        .entries()
        .iter()
        .filter_map(|entry| entry.id.clone())
        .filter(|id| post.find_by_id(id).is_some())
        .collect();

    let mut updated_ids: HashSet<String> = HashSet::new();
    for mut entry in store.entries().to_vec() {
        if let Some(id) = &entry.id {
            if post.find_by_id(id).is_some() {
                if pre_ids.contains(id.as_str()) {
                    updated_ids.insert(id.clone());
                }
                continue;
            }
            warn!(
                workflow = %entry.name,
                id = %id,
                "Staged id not present after import; rematching by name and path"
            );
        }

        let normalized_target = normalize_folder_path(&entry.target_path());
        let eligible: Vec<&SnapshotRow> = post
            .find_by_name(&entry.name)
            .into_iter()
            .filter(|row| !claimed.contains(&row.id))
            .collect();
        let pick = eligible
            .iter()
            .copied()
            .find(|row| {
                created_ids.contains(row.id.as_str()) && path_agrees(row, &normalized_target)
            })
            .map(|row| (row, "reconciled-created-at-target"))
            .or_else(|| {
                // Freshly imported rows sit at the project root until folder
                // sync moves them, so created rows match on name alone.
                eligible
                    .iter()
                    .copied()
                    .find(|row| created_ids.contains(row.id.as_str()))
                    .map(|row| (row, "reconciled-created-id-order"))
            })
            .or_else(|| {
                eligible
                    .iter()
                    .copied()
                    .find(|row| path_agrees(row, &normalized_target))
                    .map(|row| (row, "reconciled-existing-at-target"))
            });

        match pick {
            Some((row, basis)) => {
                debug!(
                    workflow = %entry.name,
                    id = %row.id,
                    basis,
                    "Reconciled to the remote-assigned id"
                );
                claimed.insert(row.id.clone());
                if pre_ids.contains(row.id.as_str()) {
                    updated_ids.insert(row.id.clone());
                }
                if eligible.len() > 1 {
                    push_note(&mut entry, basis);
                }
                entry.id = Some(row.id.clone());
                entry.updated_at = now_iso();
                store.upsert(entry);
            }
            None => {
                warn!(
                    workflow = %entry.name,
                    "No post-import row matched; leaving the entry as staged"
                );
            }
        }
    }

    let updated = updated_ids.len();
    let outcome = ReconcileOutcome {
        created: created_ids.len(),
        updated,
        unchanged: pre_ids
            .intersection(&post_ids)
            .count()
            .saturating_sub(updated),
        deleted,
    };
    info!(
        created = outcome.created,
        updated = outcome.updated,
        unchanged = outcome.unchanged,
        deleted = outcome.deleted,
        "Reconciled manifest against the post-import snapshot"
    );
    outcome
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
