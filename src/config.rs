//! Repository open options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GgitResult;
use crate::revwalk::SortMode;

/// How to find and open a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Path to the repository, its working directory, or (with `search`) any
    /// directory below it.
    pub path: PathBuf,
    /// Walk up through parent directories looking for a repository.
    pub search: bool,
    /// Keep searching across filesystem boundaries.
    pub cross_filesystem: bool,
    /// Open as a bare repository even if a working directory is present.
    pub bare: bool,
    /// Directories the upward search must not enter.
    pub ceiling_dirs: Vec<PathBuf>,
    /// Sort mode given to new revision walkers.
    pub default_sort: SortMode,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            search: true,
            cross_filesystem: false,
            bare: false,
            ceiling_dirs: Vec::new(),
            default_sort: SortMode::NONE,
        }
    }
}

impl RepositoryConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> GgitResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set search flag.
    pub fn search(mut self, value: bool) -> Self {
        self.search = value;
        self
    }

    /// Set cross_filesystem flag.
    pub fn cross_filesystem(mut self, value: bool) -> Self {
        self.cross_filesystem = value;
        self
    }

    /// Set bare flag.
    pub fn bare(mut self, value: bool) -> Self {
        self.bare = value;
        self
    }

    /// Add a ceiling directory.
    pub fn ceiling_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.ceiling_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Set the default walker sort mode.
    pub fn default_sort(mut self, mode: SortMode) -> Self {
        self.default_sort = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GgitError;

    #[test]
    fn test_builder() {
        let config = RepositoryConfig::new("/tmp/repo")
            .search(false)
            .bare(true)
            .ceiling_dir("/tmp")
            .default_sort(SortMode::TOPOLOGICAL | SortMode::TIME);

        assert_eq!(config.path, PathBuf::from("/tmp/repo"));
        assert!(!config.search);
        assert!(config.bare);
        assert_eq!(config.ceiling_dirs, vec![PathBuf::from("/tmp")]);
        assert!(config.default_sort.contains(SortMode::TIME));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RepositoryConfig::from_json(r#"{"path": "/srv/git/app.git", "bare": true}"#).unwrap();
        assert_eq!(config.path, PathBuf::from("/srv/git/app.git"));
        assert!(config.bare);
        assert!(config.search);
        assert_eq!(config.default_sort, SortMode::NONE);
    }

    #[test]
    fn test_from_json_round_trip() {
        let config = RepositoryConfig::new("repo").default_sort(SortMode::TIME | SortMode::REVERSE);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RepositoryConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json_is_a_serialization_error() {
        let err = RepositoryConfig::from_json("{\"search\": 3}").unwrap_err();
        assert!(matches!(err, GgitError::Serialization(_)));
        assert!(!err.is_contract_violation());

        let err = RepositoryConfig::from_json("{\"path\": ").unwrap_err();
        assert!(matches!(err, GgitError::Serialization(_)));
    }
}
