//! Lexical path normalization shared by item keys and glob patterns.
//!
//! Nothing here touches the file system. Keys use `/` separators, are rooted at
//! the project directory when relative, and have `.`/`..` segments resolved.

use std::path::Path;

/// Characters that make an item spec fragment a glob.
const WILDCARDS: [char; 2] = ['*', '?'];

pub fn has_wildcards(text: &str) -> bool {
    text.contains(WILDCARDS)
}

/// Normalize `spec` against `project_directory` into a comparison key.
///
/// Never fails: unrepresentable input is kept lossily rather than rejected.
pub fn normalize_path_for_comparison(spec: &str, project_directory: &Path) -> String {
    let spec = spec.trim().replace('\\', "/");
    if is_rooted(&spec) {
        return clean(&spec);
    }
    let base = project_directory.to_string_lossy().replace('\\', "/");
    if base.is_empty() {
        return clean(&spec);
    }
    clean(&format!("{base}/{spec}"))
}

/// Path of a normalized `key` relative to a normalized `base`, if it lies below it.
pub fn relative_to<'a>(key: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(key.trim_start_matches('/'));
    }
    let rest = key.strip_prefix(base)?;
    match rest.strip_prefix('/') {
        Some(rest) => Some(rest),
        None if rest.is_empty() => Some(rest),
        None => None,
    }
}

fn is_rooted(path: &str) -> bool {
    path.starts_with('/') || drive_prefix_len(path) > 0
}

fn drive_prefix_len(path: &str) -> usize {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        2
    } else {
        0
    }
}

fn clean(path: &str) -> String {
    let drive = drive_prefix_len(path);
    let (drive, rest) = path.split_at(drive);
    let rooted = rest.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    normalized.push_str(drive);
    if rooted {
        normalized.push('/');
    }
    normalized.push_str(&parts.join("/"));
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_specs_are_rooted_at_project() {
        assert_eq!(
            normalize_path_for_comparison("src/./a.rs", Path::new("/proj")),
            "/proj/src/a.rs"
        );
        assert_eq!(
            normalize_path_for_comparison("src\\..\\b.rs", Path::new("/proj")),
            "/proj/b.rs"
        );
    }

    #[test]
    fn rooted_specs_ignore_project_directory() {
        assert_eq!(
            normalize_path_for_comparison("/other//x.txt", Path::new("/proj")),
            "/other/x.txt"
        );
        assert_eq!(
            normalize_path_for_comparison("C:\\work\\x.txt", Path::new("/proj")),
            "C:/work/x.txt"
        );
    }

    #[test]
    fn parent_segments_do_not_escape_root() {
        assert_eq!(normalize_path_for_comparison("../../x", Path::new("/a")), "/x");
        assert_eq!(normalize_path_for_comparison("../x", Path::new("")), "../x");
    }

    #[test]
    fn wildcards_survive_normalization() {
        assert_eq!(
            normalize_path_for_comparison("src/**/*.r?", Path::new("/proj/")),
            "/proj/src/**/*.r?"
        );
        assert!(has_wildcards("*.txt"));
        assert!(has_wildcards("a?.txt"));
        assert!(!has_wildcards("a[1].txt"));
    }

    #[test]
    fn relative_to_requires_segment_boundary() {
        assert_eq!(relative_to("/proj/src/a.rs", "/proj"), Some("src/a.rs"));
        assert_eq!(relative_to("/project/a.rs", "/proj"), None);
        assert_eq!(relative_to("/proj", "/proj/"), Some(""));
    }
}
