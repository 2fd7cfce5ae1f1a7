//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::MatchOnMetadataOptions;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".lazyitems/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub evaluation: Evaluation,
    #[serde(default)]
    pub file_system: FileSystemSettings,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Evaluation {
    #[serde(default)]
    skip_removed_globs: Option<bool>,
    #[serde(default)]
    match_on_metadata_options: Option<MatchOnMetadataOptions>,
}

impl Evaluation {
    pub fn skip_removed_globs(&self) -> bool {
        self.skip_removed_globs.unwrap_or(true)
    }

    pub fn match_on_metadata_options(&self) -> MatchOnMetadataOptions {
        self.match_on_metadata_options.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileSystemSettings {
    #[serde(default)]
    cache_enumerations: Option<bool>,
    #[serde(default)]
    follow_links: Option<bool>,
}

impl FileSystemSettings {
    pub fn cache_enumerations(&self) -> bool {
        self.cache_enumerations.unwrap_or(true)
    }

    pub fn follow_links(&self) -> bool {
        self.follow_links.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Logging {
    #[serde(default)]
    level: Option<String>,
}

impl Logging {
    pub fn level(&self) -> String {
        self.level.clone().unwrap_or_else(|| "warn".to_owned())
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    log_level: Option<String>,
    skip_removed_globs: Option<bool>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            log_level: env::var("LAZYITEMS_LOG").ok(),
            skip_removed_globs: env::var("LAZYITEMS_SKIP_REMOVED_GLOBS")
                .ok()
                .and_then(|value| parse_flag(&value)),
        }
    }

    #[cfg(test)]
    fn for_tests(log_level: &str, skip_removed_globs: bool) -> Self {
        Self {
            log_level: Some(log_level.to_owned()),
            skip_removed_globs: Some(skip_removed_globs),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration for a project rooted somewhere below a repository.
    pub fn load_for(project_directory: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = Some(workspace_config_path(project_directory));
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::parse(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::parse(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            evaluation: Evaluation {
                skip_removed_globs: other
                    .evaluation
                    .skip_removed_globs
                    .or(self.evaluation.skip_removed_globs),
                match_on_metadata_options: other
                    .evaluation
                    .match_on_metadata_options
                    .or(self.evaluation.match_on_metadata_options),
            },
            file_system: FileSystemSettings {
                cache_enumerations: other
                    .file_system
                    .cache_enumerations
                    .or(self.file_system.cache_enumerations),
                follow_links: other.file_system.follow_links.or(self.file_system.follow_links),
            },
            logging: Logging {
                level: other.logging.level.or(self.logging.level),
            },
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("lazyitems/config.toml"))
}

fn workspace_config_path(start: &Path) -> PathBuf {
    let root = find_repo_root(start).unwrap_or_else(|| start.to_path_buf());
    root.join(DEFAULT_WORKSPACE_CONFIG_PATH)
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(level) = env.log_level {
        config.logging.level = Some(level);
    }
    if let Some(skip) = env.skip_removed_globs {
        config.evaluation.skip_removed_globs = Some(skip);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert!(config.evaluation.skip_removed_globs());
        assert_eq!(
            config.evaluation.match_on_metadata_options(),
            MatchOnMetadataOptions::CaseSensitive
        );
        assert!(config.file_system.cache_enumerations());
        assert!(!config.file_system.follow_links());
        assert_eq!(config.logging.level(), "warn");
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[evaluation]
match_on_metadata_options = "path-like"
[logging]
level = "debug"
"#,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(workspace_dir.join(".lazyitems"))?;
        fs::create_dir_all(workspace_dir.join(".git"))?;
        fs::write(
            workspace_dir.join(".lazyitems/config.toml"),
            r#"
[file_system]
follow_links = true
[logging]
level = "trace"
"#,
        )?;

        let project = workspace_dir.join("src/app");
        fs::create_dir_all(&project)?;
        let workspace_path = Some(workspace_config_path(&project));

        let config =
            Config::load_with_layers(Some(global), workspace_path, EnvOverrides::default())?;

        assert_eq!(
            config.evaluation.match_on_metadata_options(),
            MatchOnMetadataOptions::PathLike
        );
        assert!(config.file_system.follow_links());
        assert!(config.file_system.cache_enumerations());
        assert_eq!(config.logging.level(), "trace");
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests("info", false);
        let config = Config::load_with_layers(None, None, overrides)?;
        assert_eq!(config.logging.level(), "info");
        assert!(!config.evaluation.skip_removed_globs());
        Ok(())
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        let result = Config::from_file(&file);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
