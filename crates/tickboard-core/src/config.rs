//! Board configuration loaded from TOML.
//!
//! Two layers are read: the project file `.tickboard/config.toml` under a
//! project root, and the user file `<config dir>/tickboard/config.toml`.
//! Missing files yield defaults. When both exist, every section present in
//! the project file replaces the user's section wholesale.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{GroupBy, SortDir, SortField};
use crate::refs::RefMatcher;
use crate::selection::DEFAULT_DRAG_THRESHOLD;
use crate::view::ViewState;

pub const PROJECT_CONFIG_PATH: &str = ".tickboard/config.toml";
pub const USER_CONFIG_PATH: &str = "tickboard/config.toml";

/// Default ticket-reference pattern: a letter-led prefix, a dash, and an
/// alphanumeric suffix (`bd-a1b2`, `PROJ-42`).
pub const DEFAULT_REF_PATTERN: &str = r"\b[A-Za-z][A-Za-z0-9]*-[A-Za-z0-9]+\b";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub group: GroupConfig,
    #[serde(default)]
    pub refs: RefsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold_px: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: default_drag_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub sort_field: SortField,
    #[serde(default)]
    pub sort_dir: SortDir,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub collapsed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefsConfig {
    #[serde(default = "default_ref_pattern")]
    pub pattern: String,
}

impl Default for RefsConfig {
    fn default() -> Self {
        Self {
            pattern: default_ref_pattern(),
        }
    }
}

impl BoardConfig {
    /// Compile the configured reference pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when `[refs] pattern` is not a valid
    /// regular expression.
    pub fn ref_matcher(&self) -> Result<RefMatcher> {
        RefMatcher::new(&self.refs.pattern)
    }

    /// The view a board opens with before the user changes anything.
    #[must_use]
    pub fn default_view(&self) -> ViewState {
        ViewState {
            sort_field: self.query.sort_field,
            sort_dir: self.query.sort_dir,
            group_by: self.group.group_by,
            collapsed: self.group.collapsed.clone(),
            ..ViewState::default()
        }
    }
}

/// One config file as written: only the sections it actually contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigLayer {
    pub selection: Option<SelectionConfig>,
    pub query: Option<QueryConfig>,
    pub group: Option<GroupConfig>,
    pub refs: Option<RefsConfig>,
}

impl ConfigLayer {
    /// Sections from `self`, falling back to `lower` per section.
    #[must_use]
    pub fn over(self, lower: Self) -> Self {
        Self {
            selection: self.selection.or(lower.selection),
            query: self.query.or(lower.query),
            group: self.group.or(lower.group),
            refs: self.refs.or(lower.refs),
        }
    }

    #[must_use]
    pub fn resolve(self) -> BoardConfig {
        BoardConfig {
            selection: self.selection.unwrap_or_default(),
            query: self.query.unwrap_or_default(),
            group: self.group.unwrap_or_default(),
            refs: self.refs.unwrap_or_default(),
        }
    }
}

fn load_layer(path: &Path) -> Result<ConfigLayer> {
    if !path.exists() {
        debug!(path = %path.display(), "config file absent");
        return Ok(ConfigLayer::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<ConfigLayer>(&content).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Path of the user config file, if the platform has a config directory.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_PATH))
}

/// Load `.tickboard/config.toml` under `project_root`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<BoardConfig> {
    load_layer(&project_root.join(PROJECT_CONFIG_PATH)).map(ConfigLayer::resolve)
}

/// Load the user config file.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<BoardConfig> {
    match user_config_path() {
        Some(path) => load_layer(&path).map(ConfigLayer::resolve),
        None => Ok(BoardConfig::default()),
    }
}

/// Project config layered over user config.
///
/// # Errors
///
/// Returns an error if either file exists but cannot be read or parsed.
pub fn load_effective_config(project_root: &Path) -> Result<BoardConfig> {
    load_effective_config_from(project_root, user_config_path().as_deref())
}

/// [`load_effective_config`] with an explicit user config file path.
///
/// # Errors
///
/// Returns an error if either file exists but cannot be read or parsed.
pub fn load_effective_config_from(
    project_root: &Path,
    user_config: Option<&Path>,
) -> Result<BoardConfig> {
    let project = load_layer(&project_root.join(PROJECT_CONFIG_PATH))?;
    let user = match user_config {
        Some(path) => load_layer(path)?,
        None => ConfigLayer::default(),
    };
    Ok(project.over(user).resolve())
}

const fn default_drag_threshold() -> u32 {
    DEFAULT_DRAG_THRESHOLD
}

fn default_ref_pattern() -> String {
    DEFAULT_REF_PATTERN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create config dir");
        }
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = TempDir::new().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.selection.drag_threshold_px, 4);
        assert_eq!(cfg.query.sort_field, SortField::Priority);
        assert_eq!(cfg.query.sort_dir, SortDir::Asc);
        assert_eq!(cfg.group.group_by, GroupBy::None);
        assert!(cfg.group.collapsed.is_empty());
        assert_eq!(cfg.refs.pattern, DEFAULT_REF_PATTERN);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let root = TempDir::new().expect("temp dir");
        write(
            root.path(),
            PROJECT_CONFIG_PATH,
            r#"
[query]
sort_dir = "desc"

[group]
group_by = "epic"
collapsed = ["__ungrouped__"]
"#,
        );
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.query.sort_field, SortField::Priority);
        assert_eq!(cfg.query.sort_dir, SortDir::Desc);
        assert_eq!(cfg.group.group_by, GroupBy::Epic);
        assert_eq!(cfg.group.collapsed, vec!["__ungrouped__"]);

        let view = cfg.default_view();
        assert_eq!(view.group_by, GroupBy::Epic);
        assert_eq!(view.sort_dir, SortDir::Desc);
        assert!(view.filters.is_empty());
    }

    #[test]
    fn project_sections_replace_user_sections() {
        let root = TempDir::new().expect("temp dir");
        write(
            root.path(),
            PROJECT_CONFIG_PATH,
            "[selection]\ndrag_threshold_px = 8\n",
        );
        let user = write(
            root.path(),
            "user/tickboard/config.toml",
            "[selection]\ndrag_threshold_px = 2\n\n[query]\nsort_field = \"modified\"\n",
        );
        let cfg = load_effective_config_from(root.path(), Some(&user)).expect("load");
        assert_eq!(cfg.selection.drag_threshold_px, 8);
        assert_eq!(cfg.query.sort_field, SortField::Modified);
    }

    #[test]
    fn missing_user_file_is_not_an_error() {
        let root = TempDir::new().expect("temp dir");
        let missing = root.path().join("nope/config.toml");
        let cfg = load_effective_config_from(root.path(), Some(&missing)).expect("load");
        assert_eq!(cfg, BoardConfig::default());
    }

    #[test]
    fn malformed_toml_reports_path() {
        let root = TempDir::new().expect("temp dir");
        write(root.path(), PROJECT_CONFIG_PATH, "[query\nsort_field = 1");
        let err = load_project_config(root.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn unknown_names_degrade_to_other() {
        let root = TempDir::new().expect("temp dir");
        write(
            root.path(),
            PROJECT_CONFIG_PATH,
            "[query]\nsort_field = \"velocity\"\n\n[group]\ngroup_by = \"owner\"\n",
        );
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.query.sort_field, SortField::Other);
        assert_eq!(cfg.group.group_by, GroupBy::Other);
    }

    #[test]
    fn invalid_ref_pattern_surfaces_on_compile() {
        let mut cfg = BoardConfig::default();
        cfg.refs.pattern = "([a-z".to_string();
        assert!(matches!(cfg.ref_matcher(), Err(Error::InvalidPattern(_))));
        assert!(BoardConfig::default().ref_matcher().is_ok());
    }
}
