//! Category map and export settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::export::is_valid_file_name;

/// Environment variable naming a default category file.
pub const CATEGORIES_ENV: &str = "PAGESORT_CATEGORIES";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "pagesort=info"
}

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Insurance Auth", "Insurance Auths"),
    ("ID", "ID'S"),
    ("OrthoK", "OrthoK"),
    ("Outside Rx", "Outside Rx"),
    ("POF Waiver", "POF Waivers"),
    ("Rx Request", "Prescription Requests"),
    ("Referrals", "Referrals"),
    ("Summaries", "Summaries"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read category file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid category file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Category file defines no categories")]
    Empty,

    #[error("Category label must not be empty")]
    EmptyLabel,

    #[error("Duplicate category label: {0}")]
    DuplicateLabel(String),

    #[error("Folder for category '{label}' must be a single relative name, got '{folder}'")]
    InvalidFolder { label: String, folder: String },
}

/// Ordered mapping from document-type label to destination subfolder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    entries: Vec<(String, String)>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        CategoryMap {
            entries: DEFAULT_CATEGORIES
                .iter()
                .map(|(label, folder)| (label.to_string(), folder.to_string()))
                .collect(),
        }
    }
}

impl CategoryMap {
    pub fn new<I, L, F>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (L, F)>,
        L: Into<String>,
        F: Into<String>,
    {
        let mut map = CategoryMap {
            entries: Vec::new(),
        };
        for (label, folder) in entries {
            let (label, folder): (String, String) = (label.into(), folder.into());
            if label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel);
            }
            let folder = folder.trim().to_string();
            if !is_valid_file_name(&folder) {
                return Err(ConfigError::InvalidFolder { label, folder });
            }
            if map.folder_for(&label).is_some() {
                return Err(ConfigError::DuplicateLabel(label));
            }
            map.entries.push((label, folder));
        }
        if map.entries.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(map)
    }

    /// Load from a JSON file of the form `{"categories": [{"label": .., "folder": ..}]}`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CategoryFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::new(file.categories.into_iter().map(|c| (c.label, c.folder)))?;
        tracing::debug!(path = %path.display(), categories = map.len(), "Loaded category map");
        Ok(map)
    }

    /// Resolve the category map from an explicit path, `PAGESORT_CATEGORIES`, or the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CATEGORIES_ENV) {
            Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn folder_for(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, f)| f.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.folder_for(label).is_some()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, f)| (l.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryFile {
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryEntry {
    label: String,
    folder: String,
}

/// What `export_all` does when writing one page fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportPolicy {
    /// Stop at the first failure. Pages already written stay on disk.
    #[default]
    FailFast,
    /// Keep going and report every failure at the end.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub categories: CategoryMap,
    pub policy: ExportPolicy,
    pub create_missing_dirs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            categories: CategoryMap::default(),
            policy: ExportPolicy::default(),
            create_missing_dirs: true,
        }
    }
}
