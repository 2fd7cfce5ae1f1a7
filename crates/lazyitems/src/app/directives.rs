//! Loading item directives from a TOML project description.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::model::ItemElement;

/// Directives of one project, in document order.
///
/// ```toml
/// project_directory = "."
///
/// [[item]]
/// type = "Compile"
/// include = "src/**/*.rs"
///
/// [[item]]
/// type = "Compile"
/// remove = "src/generated/**/*.rs"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectiveFile {
    #[serde(default)]
    pub project_directory: Option<PathBuf>,
    #[serde(default, rename = "item")]
    pub items: Vec<ItemElement>,
}

impl DirectiveFile {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read directives: {}", path.display()))?;
        Self::parse(&data, &path.display().to_string())
    }

    /// Parse directives, tagging every element with `source` for error locations.
    pub fn parse(contents: &str, source: &str) -> Result<Self> {
        let mut file: DirectiveFile = toml::from_str(contents)
            .with_context(|| format!("failed to parse directives in {source}"))?;
        for element in &mut file.items {
            element.location.file = source.to_owned();
        }
        Ok(file)
    }

    /// Project directory, resolved relative to the directive file's folder.
    pub fn project_directory_for(&self, directive_path: &Path) -> PathBuf {
        let base = directive_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        match &self.project_directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MatchOnMetadataOptions;

    #[test]
    fn parses_items_in_order_with_locations() -> Result<()> {
        let file = DirectiveFile::parse(
            r#"
[[item]]
type = "Compile"
include = "src/**/*.rs"
line = 4

[[item]]
type = "Compile"
remove = "@(Generated)"
match_on_metadata = ["Color"]
match_on_metadata_options = "CaseInsensitive"
condition = false
"#,
            "project.toml",
        )?;

        assert_eq!(file.items.len(), 2);
        assert_eq!(file.items[0].include.as_deref(), Some("src/**/*.rs"));
        assert_eq!(file.items[0].location.to_string(), "project.toml(4)");
        assert!(file.items[0].condition);

        let remove = &file.items[1];
        assert_eq!(remove.match_on_metadata, vec!["Color"]);
        assert_eq!(
            remove.match_on_metadata_options,
            Some(MatchOnMetadataOptions::CaseInsensitive)
        );
        assert!(!remove.condition);
        Ok(())
    }

    #[test]
    fn project_directory_is_relative_to_directive_file() {
        let file = DirectiveFile {
            project_directory: Some(PathBuf::from("app")),
            items: Vec::new(),
        };
        assert_eq!(
            file.project_directory_for(Path::new("/work/project.toml")),
            PathBuf::from("/work/app")
        );
        assert_eq!(
            DirectiveFile::default().project_directory_for(Path::new("project.toml")),
            PathBuf::from(".")
        );
    }
}
