//! Domain models for items, directives, and their locations.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::path::normalize_path_for_comparison;

/// Glob texts known to be fully removed by a later directive.
pub type GlobsToIgnore = std::collections::HashSet<String>;

/// Capabilities the evaluator needs from an item representation.
pub trait Item: Clone + fmt::Debug {
    fn item_type(&self) -> &str;

    /// The include value after expansion, as written relative to the project.
    fn evaluated_include(&self) -> &str;

    fn project_directory(&self) -> &Path;

    /// Named metadata lookup. `None` when the item does not define it.
    fn metadata_value(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Key used to index the item inside an ordered collection.
    fn normalized_key(&self) -> String {
        normalize_path_for_comparison(self.evaluated_include(), self.project_directory())
    }
}

/// Construction hooks used by the include operation.
pub trait ItemFactory: Item {
    fn create(item_type: &str, evaluated_include: &str, project_directory: &Path) -> Self;

    /// Copy of `self` re-labelled as `item_type`, keeping its metadata.
    fn retyped(&self, item_type: &str) -> Self;

    fn set_metadata(&mut self, name: &str, value: &str);
}

/// Item produced by evaluating project directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectItem {
    #[serde(rename = "type")]
    item_type: String,
    include: String,
    #[serde(skip)]
    project_directory: PathBuf,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl ProjectItem {
    pub fn new(
        item_type: impl Into<String>,
        include: impl Into<String>,
        project_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            include: include.into(),
            project_directory: project_directory.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    fn well_known_metadata(&self, name: &str) -> Option<Cow<'_, str>> {
        let path = Path::new(&self.include);
        let value = if name.eq_ignore_ascii_case("Identity") {
            Cow::Borrowed(self.include.as_str())
        } else if name.eq_ignore_ascii_case("Filename") {
            Cow::Owned(
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        } else if name.eq_ignore_ascii_case("Extension") {
            Cow::Owned(
                path.extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_default(),
            )
        } else if name.eq_ignore_ascii_case("RelativeDir") {
            let dir = self
                .include
                .rfind(['/', '\\'])
                .map(|idx| &self.include[..=idx])
                .unwrap_or("");
            Cow::Borrowed(dir)
        } else {
            return None;
        };
        Some(value)
    }
}

impl Item for ProjectItem {
    fn item_type(&self) -> &str {
        &self.item_type
    }

    fn evaluated_include(&self) -> &str {
        &self.include
    }

    fn project_directory(&self) -> &Path {
        &self.project_directory
    }

    fn metadata_value(&self, name: &str) -> Option<Cow<'_, str>> {
        if let Some(value) = self.well_known_metadata(name) {
            return Some(value);
        }
        self.metadata
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| Cow::Borrowed(value.as_str()))
    }
}

impl ItemFactory for ProjectItem {
    fn create(item_type: &str, evaluated_include: &str, project_directory: &Path) -> Self {
        Self::new(item_type, evaluated_include, project_directory)
    }

    fn retyped(&self, item_type: &str) -> Self {
        Self {
            item_type: item_type.to_owned(),
            ..self.clone()
        }
    }

    fn set_metadata(&mut self, name: &str, value: &str) {
        let existing = self
            .metadata
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned();
        self.metadata
            .insert(existing.unwrap_or_else(|| name.to_owned()), value.to_owned());
    }
}

/// Where a directive was declared, used to tag project errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ElementLocation {
    #[serde(skip)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl ElementLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ElementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (0, _) => write!(f, "{}", self.file),
            (line, 0) => write!(f, "{}({line})", self.file),
            (line, column) => write!(f, "{}({line},{column})", self.file),
        }
    }
}

/// Comparison mode for metadata values under `MatchOnMetadata`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchOnMetadataOptions {
    #[default]
    #[serde(alias = "CaseSensitive")]
    CaseSensitive,
    #[serde(alias = "CaseInsensitive")]
    CaseInsensitive,
    /// Values are compared as normalized paths.
    #[serde(alias = "PathLike")]
    PathLike,
}

impl FromStr for MatchOnMetadataOptions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "casesensitive" => Ok(Self::CaseSensitive),
            "caseinsensitive" => Ok(Self::CaseInsensitive),
            "pathlike" => Ok(Self::PathLike),
            other => Err(format!("unknown MatchOnMetadataOptions value '{other}'")),
        }
    }
}

fn default_condition() -> bool {
    true
}

/// One parsed item directive (`<Type Include=".." />`, `<Type Remove=".." />`).
///
/// The condition arrives already evaluated.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemElement {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub remove: Option<String>,
    #[serde(default)]
    pub match_on_metadata: Vec<String>,
    #[serde(default)]
    pub match_on_metadata_options: Option<MatchOnMetadataOptions>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default = "default_condition")]
    pub condition: bool,
    #[serde(flatten)]
    pub location: ElementLocation,
}

impl ItemElement {
    pub fn include(item_type: impl Into<String>, include: impl Into<String>) -> Self {
        Self {
            include: Some(include.into()),
            ..Self::empty(item_type)
        }
    }

    pub fn remove(item_type: impl Into<String>, remove: impl Into<String>) -> Self {
        Self {
            remove: Some(remove.into()),
            ..Self::empty(item_type)
        }
    }

    pub fn with_exclude(mut self, exclude: impl Into<String>) -> Self {
        self.exclude = Some(exclude.into());
        self
    }

    pub fn with_condition(mut self, condition: bool) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    pub fn matching_on_metadata<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
        options: Option<MatchOnMetadataOptions>,
    ) -> Self {
        self.match_on_metadata = names.into_iter().map(Into::into).collect();
        self.match_on_metadata_options = options;
        self
    }

    pub fn at(mut self, location: ElementLocation) -> Self {
        self.location = location;
        self
    }

    fn empty(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            include: None,
            exclude: None,
            remove: None,
            match_on_metadata: Vec::new(),
            match_on_metadata_options: None,
            metadata: BTreeMap::new(),
            condition: true,
            location: ElementLocation::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_lookup_is_case_insensitive() {
        let item = ProjectItem::new("Compile", "src/a.rs", "/proj").with_metadata("Color", "red");
        assert_eq!(item.metadata_value("color").as_deref(), Some("red"));
        assert_eq!(item.metadata_value("Size"), None);
    }

    #[test]
    fn well_known_metadata_derives_from_include() {
        let item = ProjectItem::new("Compile", "src/nested/lib.rs", "/proj");
        assert_eq!(item.metadata_value("Identity").as_deref(), Some("src/nested/lib.rs"));
        assert_eq!(item.metadata_value("Filename").as_deref(), Some("lib"));
        assert_eq!(item.metadata_value("Extension").as_deref(), Some(".rs"));
        assert_eq!(item.metadata_value("RelativeDir").as_deref(), Some("src/nested/"));
    }

    #[test]
    fn set_metadata_reuses_existing_casing() {
        let mut item = ProjectItem::new("Compile", "a.rs", "/proj").with_metadata("Color", "red");
        item.set_metadata("COLOR", "blue");
        assert_eq!(item.metadata().len(), 1);
        assert_eq!(item.metadata().get("Color").map(String::as_str), Some("blue"));
    }

    #[test]
    fn location_display_omits_missing_positions() {
        assert_eq!(ElementLocation::new("proj.toml", 0, 0).to_string(), "proj.toml");
        assert_eq!(ElementLocation::new("proj.toml", 4, 0).to_string(), "proj.toml(4)");
        assert_eq!(ElementLocation::new("proj.toml", 4, 9).to_string(), "proj.toml(4,9)");
    }

    #[test]
    fn match_options_parse_from_directive_spelling() {
        assert_eq!(
            "PathLike".parse::<MatchOnMetadataOptions>(),
            Ok(MatchOnMetadataOptions::PathLike)
        );
        assert_eq!(
            "case-insensitive".parse::<MatchOnMetadataOptions>(),
            Ok(MatchOnMetadataOptions::CaseInsensitive)
        );
        assert!("fuzzy".parse::<MatchOnMetadataOptions>().is_err());
    }
}
