//! Item specifications: the parsed form of `Include`/`Exclude`/`Remove` text.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::{EvalError, ProjectErrorCode};
use crate::domain::model::{ElementLocation, Item};
use crate::domain::path::{has_wildcards, normalize_path_for_comparison};

static ITEM_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@\(\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\)$").expect("item reference regex")
});

/// Fixed text denoting exactly one key.
#[derive(Debug, Clone)]
pub struct LiteralFragment {
    text: String,
    project_directory: PathBuf,
    normalized: String,
}

/// Wildcard pattern; matchable without touching the file system.
#[derive(Debug, Clone)]
pub struct GlobFragment {
    text: String,
    project_directory: PathBuf,
    normalized_pattern: String,
    matcher: GlobMatcher,
}

/// `@(Type)`: every item of another collection at the point of reference.
#[derive(Debug, Clone)]
pub struct ItemReferenceFragment<I> {
    text: String,
    item_type: String,
    project_directory: PathBuf,
    items: Vec<I>,
    normalized_keys: HashSet<String>,
}

#[derive(Debug, Clone)]
pub enum Fragment<I> {
    Literal(LiteralFragment),
    Glob(GlobFragment),
    ItemReference(ItemReferenceFragment<I>),
}

impl LiteralFragment {
    pub fn new(text: impl Into<String>, project_directory: impl Into<PathBuf>) -> Self {
        let text = text.into();
        let project_directory = project_directory.into();
        let normalized = normalize_path_for_comparison(&text, &project_directory);
        Self {
            text,
            project_directory,
            normalized,
        }
    }
}

impl GlobFragment {
    pub fn new(
        text: impl Into<String>,
        project_directory: impl Into<PathBuf>,
    ) -> Result<Self, globset::Error> {
        let text = text.into();
        let project_directory = project_directory.into();
        let normalized_pattern = normalize_path_for_comparison(&text, &project_directory);
        let matcher = GlobBuilder::new(&escape_non_wildcards(&normalized_pattern))
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            text,
            project_directory,
            normalized_pattern,
            matcher,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_match(&self, normalized_key: &str) -> bool {
        self.matcher.is_match(normalized_key)
    }

    /// Directory prefix of the pattern that contains no wildcard, and the rest.
    pub fn split_fixed_directory(&self) -> (&str, &str) {
        let pattern = self.normalized_pattern.as_str();
        let first_wild = pattern.find(['*', '?']).unwrap_or(pattern.len());
        match pattern[..first_wild].rfind('/') {
            Some(0) => ("/", &pattern[1..]),
            Some(idx) => (&pattern[..idx], &pattern[idx + 1..]),
            None => ("", pattern),
        }
    }
}

impl<I: Item> ItemReferenceFragment<I> {
    pub fn new(
        text: impl Into<String>,
        item_type: impl Into<String>,
        project_directory: impl Into<PathBuf>,
        items: Vec<I>,
    ) -> Self {
        let project_directory = project_directory.into();
        let normalized_keys = items
            .iter()
            .map(|item| normalize_path_for_comparison(item.evaluated_include(), &project_directory))
            .collect();
        Self {
            text: text.into(),
            item_type: item_type.into(),
            project_directory,
            items,
            normalized_keys,
        }
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn items(&self) -> &[I] {
        &self.items
    }
}

impl<I: Item> Fragment<I> {
    /// Text of the fragment as written in the directive.
    pub fn text(&self) -> &str {
        match self {
            Self::Literal(f) => &f.text,
            Self::Glob(f) => &f.text,
            Self::ItemReference(f) => &f.text,
        }
    }

    pub fn project_directory(&self) -> &Path {
        match self {
            Self::Literal(f) => &f.project_directory,
            Self::Glob(f) => &f.project_directory,
            Self::ItemReference(f) => &f.project_directory,
        }
    }

    /// Unnormalized specs this fragment denotes, when they can be listed
    /// without touching the file system. Globs return `None`.
    pub fn referenced_items(&self) -> Option<Vec<&str>> {
        match self {
            Self::Literal(f) => Some(vec![f.text.as_str()]),
            Self::ItemReference(f) => {
                Some(f.items.iter().map(|item| item.evaluated_include()).collect())
            }
            Self::Glob(_) => None,
        }
    }

    /// Whether an already-normalized key is denoted by this fragment.
    pub fn is_match_normalized(&self, key: &str) -> bool {
        match self {
            Self::Literal(f) => f.normalized == key,
            Self::Glob(f) => f.is_match(key),
            Self::ItemReference(f) => f.normalized_keys.contains(key),
        }
    }

    pub fn is_item_reference(&self) -> bool {
        matches!(self, Self::ItemReference(_))
    }
}

/// Ordered fragments of one directive attribute, owned by an item type.
#[derive(Debug, Clone)]
pub struct ItemSpec<I> {
    item_type: String,
    fragments: Vec<Fragment<I>>,
}

impl<I: Item> ItemSpec<I> {
    pub fn new(item_type: impl Into<String>, fragments: Vec<Fragment<I>>) -> Self {
        Self {
            item_type: item_type.into(),
            fragments,
        }
    }

    /// Parse `text` into fragments.
    ///
    /// `resolve` supplies the current items of a referenced item type.
    pub fn parse<F>(
        text: &str,
        item_type: &str,
        project_directory: &Path,
        location: &ElementLocation,
        mut resolve: F,
    ) -> Result<Self, EvalError>
    where
        F: FnMut(&str) -> Result<Vec<I>, EvalError>,
    {
        let mut fragments = Vec::new();
        for raw in split_item_spec(text) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let fragment = if raw.starts_with("@(") {
                let captures = ITEM_REFERENCE.captures(raw).ok_or_else(|| {
                    EvalError::invalid_project(
                        location,
                        ProjectErrorCode::UnsupportedItemExpression,
                        format!("item expression '{raw}' is not a bare @(Type) reference"),
                    )
                })?;
                let referenced_type = &captures[1];
                let items = resolve(referenced_type)?;
                Fragment::ItemReference(ItemReferenceFragment::new(
                    raw,
                    referenced_type,
                    project_directory,
                    items,
                ))
            } else if has_wildcards(raw) {
                let glob = GlobFragment::new(raw, project_directory).map_err(|err| {
                    EvalError::invalid_project(
                        location,
                        ProjectErrorCode::InvalidGlobPattern,
                        format!("glob '{raw}' is invalid: {err}"),
                    )
                })?;
                Fragment::Glob(glob)
            } else {
                Fragment::Literal(LiteralFragment::new(raw, project_directory))
            };
            fragments.push(fragment);
        }

        Ok(Self::new(item_type, fragments))
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn fragments(&self) -> &[Fragment<I>] {
        &self.fragments
    }

    /// True for exactly one `@(Type)` fragment naming `item_type`.
    pub fn is_single_bare_reference_to(&self, item_type: &str) -> bool {
        match self.fragments.as_slice() {
            [Fragment::ItemReference(reference)] => {
                reference.item_type.eq_ignore_ascii_case(item_type)
            }
            _ => false,
        }
    }

    pub fn is_match_normalized(&self, key: &str) -> bool {
        self.fragments
            .iter()
            .any(|fragment| fragment.is_match_normalized(key))
    }

    /// Items reachable through the spec's item-reference fragments.
    pub fn referenced_items(&self) -> impl Iterator<Item = &I> {
        self.fragments.iter().flat_map(|fragment| match fragment {
            Fragment::ItemReference(reference) => reference.items.iter(),
            _ => std::slice::Iter::default(),
        })
    }

    pub fn globs(&self) -> impl Iterator<Item = &GlobFragment> {
        self.fragments.iter().filter_map(|fragment| match fragment {
            Fragment::Glob(glob) => Some(glob),
            _ => None,
        })
    }
}

/// Whether `text` is exactly one `@(Type)` naming `item_type`, checked
/// without resolving anything.
pub fn is_bare_reference_text(text: &str, item_type: &str) -> bool {
    let mut pieces = split_item_spec(text)
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty());
    match (pieces.next(), pieces.next()) {
        (Some(piece), None) => ITEM_REFERENCE
            .captures(piece)
            .is_some_and(|captures| captures[1].eq_ignore_ascii_case(item_type)),
        _ => false,
    }
}

/// Split on `;` outside parentheses, so `@(A, ';')` stays one piece.
fn split_item_spec(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                pieces.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Make every glob metacharacter except `*` and `?` literal.
fn escape_non_wildcards(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '[' | ']' | '{' | '}' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProjectItem;

    fn parse(text: &str) -> Result<ItemSpec<ProjectItem>, EvalError> {
        ItemSpec::parse(
            text,
            "Compile",
            Path::new("/proj"),
            &ElementLocation::new("proj.toml", 3, 0),
            |referenced| {
                Ok(vec![ProjectItem::new(
                    referenced,
                    format!("{}.txt", referenced.to_lowercase()),
                    "/proj",
                )])
            },
        )
    }

    #[test]
    fn classifies_fragments() {
        let spec = parse("a.txt; src/**/*.rs ;@(Content);;").unwrap();
        let kinds: Vec<_> = spec
            .fragments()
            .iter()
            .map(|f| match f {
                Fragment::Literal(_) => "literal",
                Fragment::Glob(_) => "glob",
                Fragment::ItemReference(_) => "reference",
            })
            .collect();
        assert_eq!(kinds, vec!["literal", "glob", "reference"]);
        assert_eq!(spec.fragments()[1].text(), "src/**/*.rs");
    }

    #[test]
    fn literal_and_reference_enumerate_keys_but_glob_does_not() {
        let spec = parse("a.txt;*.cs;@(Content)").unwrap();
        assert_eq!(spec.fragments()[0].referenced_items(), Some(vec!["a.txt"]));
        assert_eq!(spec.fragments()[1].referenced_items(), None);
        assert_eq!(spec.fragments()[2].referenced_items(), Some(vec!["content.txt"]));
    }

    #[test]
    fn glob_star_does_not_cross_directories() {
        let spec = parse("*.txt;src/**/*.rs").unwrap();
        let star = &spec.fragments()[0];
        assert!(star.is_match_normalized("/proj/a.txt"));
        assert!(!star.is_match_normalized("/proj/sub/a.txt"));

        let recursive = &spec.fragments()[1];
        assert!(recursive.is_match_normalized("/proj/src/lib.rs"));
        assert!(recursive.is_match_normalized("/proj/src/deep/nested/mod.rs"));
        assert!(!recursive.is_match_normalized("/proj/tests/lib.rs"));
    }

    #[test]
    fn glob_brackets_are_literal() {
        let spec = parse("data[1]/*.csv").unwrap();
        assert!(spec.fragments()[0].is_match_normalized("/proj/data[1]/x.csv"));
        assert!(!spec.fragments()[0].is_match_normalized("/proj/data1/x.csv"));
    }

    #[test]
    fn split_fixed_directory_stops_at_first_wildcard() {
        let spec = parse("src/gen/**/*.rs").unwrap();
        let glob = spec.globs().next().unwrap();
        assert_eq!(glob.split_fixed_directory(), ("/proj/src/gen", "**/*.rs"));
    }

    #[test]
    fn detects_single_self_reference_case_insensitively() {
        assert!(parse("@(compile)").unwrap().is_single_bare_reference_to("Compile"));
        assert!(!parse("@(Compile);a.txt").unwrap().is_single_bare_reference_to("Compile"));
        assert!(!parse("@(Content)").unwrap().is_single_bare_reference_to("Compile"));
    }

    #[test]
    fn transforms_are_rejected_with_location() {
        let err = parse("@(Content->'%(Filename)')").unwrap_err();
        assert_eq!(err.code(), Some(ProjectErrorCode::UnsupportedItemExpression));
        assert!(err.to_string().starts_with("proj.toml(3)"));
    }

    #[test]
    fn bare_reference_text_needs_a_single_matching_reference() {
        assert!(is_bare_reference_text(" @( compile ) ;", "Compile"));
        assert!(!is_bare_reference_text("@(Compile);a.cs", "Compile"));
        assert!(!is_bare_reference_text("@(Content)", "Compile"));
        assert!(!is_bare_reference_text("@(Compile->'%(Filename)')", "Compile"));
    }

    #[test]
    fn split_respects_parentheses() {
        assert_eq!(split_item_spec("a;@(B, ';');c"), vec!["a", "@(B, ';')", "c"]);
    }
}
