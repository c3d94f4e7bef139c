//! Canonical remote shapes, plus the tolerant raw forms they are decoded
//! from.
//!
//! The remote API is inconsistent about envelopes and field names: listings
//! arrive as a bare array or as `{"data": [...]}`, folder parents appear as
//! `parentFolderId` or nested `parentFolder.id`, project references as
//! `projectId`, `homeProject.id`, or `homeProjectId`, and workflow versions
//! as `versionId` or `version.id`. All of that is collapsed here, once, so
//! the rest of the engine only ever sees one struct per concept.

use serde::{Deserialize, Serialize};

/// Kind of remote project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Personal,
    Team,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub kind: ProjectKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    /// Absent on some API versions; the cache resolves it by inheritance.
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorkflow {
    pub id: String,
    pub name: String,
    pub folder_id: Option<String>,
    pub project_id: Option<String>,
    pub version_id: Option<String>,
    /// Stable marker embedded by the source instance, independent of id.
    pub instance_marker: Option<String>,
}

// ---- Raw wire forms ----

/// A listing response: bare array or `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Wrapped { data } => data,
        }
    }
}

/// A single-object response: bare object or `{"data": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Enveloped<T> {
    Bare(T),
    Wrapped { data: T },
}

impl<T> Enveloped<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Enveloped::Bare(inner) => inner,
            Enveloped::Wrapped { data } => data,
        }
    }
}

/// Nested `{"id": ...}` reference used by several fallback fields.
#[derive(Debug, Deserialize)]
pub(crate) struct IdRef {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProject {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
}

impl From<RawProject> for Project {
    fn from(raw: RawProject) -> Self {
        let kind = match raw.kind.as_deref() {
            Some("team") => ProjectKind::Team,
            _ => ProjectKind::Personal,
        };
        Project {
            id: raw.id,
            name: raw.name,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFolder {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) parent_folder_id: Option<String>,
    #[serde(default)]
    pub(crate) parent_folder: Option<IdRef>,
    #[serde(default)]
    pub(crate) project_id: Option<String>,
    #[serde(default)]
    pub(crate) home_project: Option<IdRef>,
    #[serde(default)]
    pub(crate) home_project_id: Option<String>,
}

impl From<RawFolder> for Folder {
    fn from(raw: RawFolder) -> Self {
        let parent_id = raw
            .parent_folder_id
            .or(raw.parent_folder.map(|r| r.id));
        let project_id = raw
            .project_id
            .or(raw.home_project.map(|r| r.id))
            .or(raw.home_project_id);
        Folder {
            id: raw.id,
            name: raw.name,
            parent_id,
            project_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMeta {
    #[serde(default)]
    pub(crate) instance_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawWorkflow {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) parent_folder_id: Option<String>,
    #[serde(default)]
    pub(crate) parent_folder: Option<IdRef>,
    #[serde(default)]
    pub(crate) project_id: Option<String>,
    #[serde(default)]
    pub(crate) home_project: Option<IdRef>,
    #[serde(default)]
    pub(crate) home_project_id: Option<String>,
    #[serde(default)]
    pub(crate) version_id: Option<String>,
    #[serde(default)]
    pub(crate) version: Option<IdRef>,
    #[serde(default)]
    pub(crate) meta: Option<RawMeta>,
}

impl From<RawWorkflow> for RemoteWorkflow {
    fn from(raw: RawWorkflow) -> Self {
        let folder_id = raw
            .parent_folder_id
            .or(raw.parent_folder.map(|r| r.id));
        let project_id = raw
            .project_id
            .or(raw.home_project.map(|r| r.id))
            .or(raw.home_project_id);
        let version_id = raw.version_id.or(raw.version.map(|r| r.id));
        let instance_marker = raw.meta.and_then(|m| m.instance_id);
        RemoteWorkflow {
            id: raw.id,
            name: raw.name,
            folder_id,
            project_id,
            version_id,
            instance_marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_bare_array() {
        let listing: Listing<RawProject> =
            serde_json::from_str(r#"[{"id": "p1", "name": "Personal", "type": "personal"}]"#)
                .expect("Should deserialize");
        let projects: Vec<Project> = listing.into_vec().into_iter().map(Project::from).collect();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "p1");
        assert_eq!(projects[0].kind, ProjectKind::Personal);
    }

    #[test]
    fn test_listing_wrapped_in_data() {
        let listing: Listing<RawProject> =
            serde_json::from_str(r#"{"data": [{"id": "p2", "name": "Ops", "type": "team"}]}"#)
                .expect("Should deserialize");
        let projects: Vec<Project> = listing.into_vec().into_iter().map(Project::from).collect();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].kind, ProjectKind::Team);
    }

    #[test]
    fn test_project_kind_defaults_to_personal() {
        let raw: RawProject =
            serde_json::from_str(r#"{"id": "p1", "name": "X"}"#).expect("Should deserialize");
        assert_eq!(Project::from(raw).kind, ProjectKind::Personal);
    }

    #[test]
    fn test_folder_parent_fallback_chain() {
        let direct: RawFolder = serde_json::from_str(
            r#"{"id": "f1", "name": "A", "parentFolderId": "f0", "projectId": "p1"}"#,
        )
        .expect("Should deserialize");
        assert_eq!(Folder::from(direct).parent_id.as_deref(), Some("f0"));

        let nested: RawFolder = serde_json::from_str(
            r#"{"id": "f1", "name": "A", "parentFolder": {"id": "f0"}, "homeProject": {"id": "p1"}}"#,
        )
        .expect("Should deserialize");
        let folder = Folder::from(nested);
        assert_eq!(folder.parent_id.as_deref(), Some("f0"));
        assert_eq!(folder.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_folder_project_fallback_order() {
        let raw: RawFolder = serde_json::from_str(
            r#"{"id": "f1", "name": "A", "projectId": "direct", "homeProjectId": "fallback"}"#,
        )
        .expect("Should deserialize");
        assert_eq!(Folder::from(raw).project_id.as_deref(), Some("direct"));
    }

    #[test]
    fn test_folder_missing_project_is_none() {
        let raw: RawFolder =
            serde_json::from_str(r#"{"id": "f1", "name": "A"}"#).expect("Should deserialize");
        let folder = Folder::from(raw);
        assert!(folder.project_id.is_none());
        assert!(folder.parent_id.is_none());
    }

    #[test]
    fn test_workflow_version_and_marker_fallbacks() {
        let raw: RawWorkflow = serde_json::from_str(
            r#"{
                "id": "aB3dE5fG7hJ9kL1m",
                "name": "Sync Orders",
                "parentFolder": {"id": "f2"},
                "homeProjectId": "p1",
                "version": {"id": "v9"},
                "meta": {"instanceId": "inst-123"}
            }"#,
        )
        .expect("Should deserialize");
        let wf = RemoteWorkflow::from(raw);
        assert_eq!(wf.folder_id.as_deref(), Some("f2"));
        assert_eq!(wf.project_id.as_deref(), Some("p1"));
        assert_eq!(wf.version_id.as_deref(), Some("v9"));
        assert_eq!(wf.instance_marker.as_deref(), Some("inst-123"));
    }

    #[test]
    fn test_workflow_tolerates_unknown_fields() {
        let raw: RawWorkflow = serde_json::from_str(
            r#"{"id": "x", "name": "y", "active": true, "nodes": [], "connections": {}}"#,
        )
        .expect("Should deserialize");
        let wf = RemoteWorkflow::from(raw);
        assert!(wf.folder_id.is_none());
        assert!(wf.version_id.is_none());
    }

    #[test]
    fn test_enveloped_single_object() {
        let bare: Enveloped<RawProject> =
            serde_json::from_str(r#"{"id": "p1", "name": "X"}"#).expect("Should deserialize");
        assert_eq!(bare.into_inner().id, "p1");

        let wrapped: Enveloped<RawProject> =
            serde_json::from_str(r#"{"data": {"id": "p2", "name": "Y"}}"#)
                .expect("Should deserialize");
        assert_eq!(wrapped.into_inner().id, "p2");
    }
}
