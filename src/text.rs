//! Text normalization shared by every matching component.
//!
//! Remote names, on-disk directory segments, and manifest keys all pass
//! through here so that the same workflow is recognized regardless of
//! casing, stray whitespace, or control characters in any one source.

/// Strip control characters and collapse whitespace runs into single spaces.
#[must_use]
pub fn clean_text(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case- and whitespace-insensitive key for name comparisons.
#[must_use]
pub fn comparison_key(s: &str) -> String {
    clean_text(s).to_lowercase()
}

/// Reduce a name to lowercase alphanumerics joined by single hyphens.
#[must_use]
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if c == ' ' || c == '_' || c == '-' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Normalize a folder path for lookups: split on `/`, slugify each segment,
/// drop segments that come out empty, and re-join.
///
/// `"A//B/"`, `"A/B"`, and `" A / B "` all normalize to `"a/b"`, so slugged
/// on-disk directory names resolve against display-cased remote folder names.
#[must_use]
pub fn normalize_folder_path(path: &str) -> String {
    path.split('/')
        .map(slugify)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Make a display name safe to use as a file or directory name, keeping its
/// casing. Path separators and other filesystem-hostile characters become
/// hyphens; whitespace is cleaned but preserved.
#[must_use]
pub fn fs_safe_name(s: &str) -> String {
    let cleaned = clean_text(s);
    let replaced: String = cleaned
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hello   World  "), "Hello World");
        assert_eq!(clean_text("tabs\tand\nnewlines"), "tabs and newlines");
        assert_eq!(clean_text("ctrl\u{0007}char"), "ctrl char");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_comparison_key() {
        assert_eq!(comparison_key("My Workflow"), "my workflow");
        assert_eq!(comparison_key("  MY   workflow "), "my workflow");
        assert_eq!(comparison_key("My Workflow"), comparison_key("my WORKFLOW"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Client Onboarding v2"), "client-onboarding-v2");
        assert_eq!(slugify("  Spaces  "), "spaces");
        assert_eq!(slugify("multiple---hyphens"), "multiple-hyphens");
        assert_eq!(slugify("Under_score"), "under-score");
        assert_eq!(slugify("émoji ✨ stripped"), "moji-stripped");
    }

    #[test]
    fn test_normalize_folder_path() {
        assert_eq!(normalize_folder_path("A/B"), "a/b");
        assert_eq!(normalize_folder_path("A//B/"), "a/b");
        assert_eq!(normalize_folder_path(" A / B "), "a/b");
        assert_eq!(normalize_folder_path("Clients/Acme Corp"), "clients/acme-corp");
        assert_eq!(normalize_folder_path(""), "");
        assert_eq!(normalize_folder_path("///"), "");
    }

    #[test]
    fn test_fs_safe_name() {
        assert_eq!(fs_safe_name("Acme Corp"), "Acme Corp");
        assert_eq!(fs_safe_name("a/b\\c"), "a-b-c");
        assert_eq!(fs_safe_name("what?"), "what-");
        assert_eq!(fs_safe_name("..."), "unnamed");
        assert_eq!(fs_safe_name(""), "unnamed");
    }
}
