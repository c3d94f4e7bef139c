use super::*;

fn project(id: &str, name: &str, kind: ProjectKind) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        kind,
    }
}

fn folder(id: &str, name: &str, parent: Option<&str>, project: Option<&str>) -> Folder {
    Folder {
        id: id.to_string(),
        name: name.to_string(),
        parent_id: parent.map(str::to_string),
        project_id: project.map(str::to_string),
    }
}

fn workflow(id: &str, name: &str, folder: Option<&str>, project: Option<&str>) -> RemoteWorkflow {
    RemoteWorkflow {
        id: id.to_string(),
        name: name.to_string(),
        folder_id: folder.map(str::to_string),
        project_id: project.map(str::to_string),
        version_id: Some(format!("v-{id}")),
        instance_marker: None,
    }
}

fn standard_cache() -> RemoteStateCache {
    RemoteStateCache::load(
        vec![
            project("p-team", "Ops Team", ProjectKind::Team),
            project("p-personal", "Personal", ProjectKind::Personal),
        ],
        vec![
            folder("f-clients", "Clients", None, Some("p-personal")),
            folder("f-acme", "Acme Corp", Some("f-clients"), Some("p-personal")),
            folder("f-ops", "Runbooks", None, Some("p-team")),
        ],
        vec![
            workflow("aaaaaaaaaaaaaaaa", "Sync Orders", Some("f-acme"), Some("p-personal")),
            workflow("bbbbbbbbbbbbbbbb", "Nightly Report", None, Some("p-team")),
        ],
    )
    .expect("Should load cache")
}

#[test]
fn test_no_projects_is_fatal() {
    let result = RemoteStateCache::load(vec![], vec![], vec![]);
    assert!(matches!(result, Err(CacheError::NoProjects)));
}

#[test]
fn test_default_project_prefers_personal() {
    let cache = standard_cache();
    assert_eq!(cache.default_project_id(), "p-personal");
}

#[test]
fn test_default_project_falls_back_to_first() {
    let cache = RemoteStateCache::load(
        vec![
            project("p-a", "Alpha", ProjectKind::Team),
            project("p-b", "Beta", ProjectKind::Team),
        ],
        vec![],
        vec![],
    )
    .expect("Should load cache");
    assert_eq!(cache.default_project_id(), "p-a");
}

#[test]
fn test_project_resolution_by_name_slug_and_alias() {
    let cache = standard_cache();
    assert_eq!(cache.resolve_project("Ops Team"), Some("p-team"));
    assert_eq!(cache.resolve_project("ops team"), Some("p-team"));
    assert_eq!(cache.resolve_project("ops-team"), Some("p-team"));
    assert_eq!(cache.resolve_project("personal"), Some("p-personal"));
    assert_eq!(cache.resolve_project("Nonexistent"), None);
}

#[test]
fn test_folder_path_resolution_is_normalized() {
    let cache = standard_cache();
    assert_eq!(
        cache.resolve_folder_path("p-personal", "Clients/Acme Corp"),
        Some("f-acme")
    );
    assert_eq!(
        cache.resolve_folder_path("p-personal", "clients/acme-corp"),
        Some("f-acme")
    );
    assert_eq!(
        cache.resolve_folder_path("p-personal", " Clients //Acme Corp/ "),
        Some("f-acme")
    );
    assert_eq!(cache.resolve_folder_path("p-team", "Clients/Acme Corp"), None);
}

#[test]
fn test_folder_display_path() {
    let cache = standard_cache();
    assert_eq!(
        cache.folder_display_path("f-acme"),
        Some("Clients/Acme Corp")
    );
    assert_eq!(cache.folder_display_path("f-clients"), Some("Clients"));
    assert_eq!(cache.folder_project("f-ops"), Some("p-team"));
}

#[test]
fn test_missing_project_inherited_from_parent() {
    let cache = RemoteStateCache::load(
        vec![project("p-1", "Personal", ProjectKind::Personal)],
        vec![
            folder("f-root", "Top", None, Some("p-1")),
            // No project reference of its own
            folder("f-child", "Inside", Some("f-root"), None),
        ],
        vec![],
    )
    .expect("Should load cache");
    assert_eq!(cache.folder_project("f-child"), Some("p-1"));
    assert_eq!(cache.resolve_folder_path("p-1", "Top/Inside"), Some("f-child"));
}

#[test]
fn test_missing_project_everywhere_uses_default() {
    let cache = RemoteStateCache::load(
        vec![project("p-1", "Personal", ProjectKind::Personal)],
        vec![folder("f-orphan", "Orphan", None, None)],
        vec![],
    )
    .expect("Should load cache");
    assert_eq!(cache.folder_project("f-orphan"), Some("p-1"));
}

#[test]
fn test_parent_pointing_nowhere_ends_chain() {
    let cache = RemoteStateCache::load(
        vec![project("p-1", "Personal", ProjectKind::Personal)],
        vec![folder("f-1", "Dangling", Some("f-ghost"), Some("p-1"))],
        vec![],
    )
    .expect("Should load cache");
    assert_eq!(cache.folder_display_path("f-1"), Some("Dangling"));
}

#[test]
fn test_cyclic_parents_terminate() {
    let cache = RemoteStateCache::load(
        vec![project("p-1", "Personal", ProjectKind::Personal)],
        vec![
            folder("f-a", "A", Some("f-b"), Some("p-1")),
            folder("f-b", "B", Some("f-a"), None),
        ],
        vec![],
    )
    .expect("Cycle must not prevent loading");
    // Path is truncated at the hop bound but exists.
    let path = cache.folder_display_path("f-a").expect("Should have a path");
    assert!(path.contains('A'));
    assert!(path.split('/').count() <= MAX_PATH_DEPTH);
}

#[test]
fn test_workflow_locations() {
    let cache = standard_cache();
    let loc = cache
        .workflow_location("aaaaaaaaaaaaaaaa")
        .expect("Should be cached");
    assert_eq!(loc.folder_id.as_deref(), Some("f-acme"));
    assert_eq!(loc.version_id.as_deref(), Some("v-aaaaaaaaaaaaaaaa"));
    assert!(cache.workflow_location("unknown").is_none());
    assert_eq!(cache.workflow_count(), 2);
}

#[test]
fn test_workflow_relative_path() {
    let cache = standard_cache();
    assert_eq!(
        cache.workflow_relative_path("aaaaaaaaaaaaaaaa"),
        Some("Personal/Clients/Acme Corp".to_string())
    );
    // No folder: just the project name.
    assert_eq!(
        cache.workflow_relative_path("bbbbbbbbbbbbbbbb"),
        Some("Ops Team".to_string())
    );
    assert_eq!(cache.workflow_relative_path("unknown"), None);
}

#[test]
fn test_register_folder_extends_lookups() {
    let mut cache = standard_cache();
    assert_eq!(cache.resolve_folder_path("p-personal", "Clients/New Co"), None);
    cache.register_folder("f-new", "p-personal", "Clients/New Co");
    assert_eq!(
        cache.resolve_folder_path("p-personal", "clients/new-co"),
        Some("f-new")
    );
    assert_eq!(cache.folder_display_path("f-new"), Some("Clients/New Co"));
}

#[test]
fn test_register_project_extends_lookups() {
    let mut cache = standard_cache();
    assert_eq!(cache.resolve_project("Marketing"), None);
    cache.register_project(&project("p-mkt", "Marketing", ProjectKind::Team));
    assert_eq!(cache.resolve_project("marketing"), Some("p-mkt"));
    assert_eq!(cache.project_display_name("p-mkt"), Some("Marketing"));
}
