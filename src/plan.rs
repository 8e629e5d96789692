//! Page assignments supplied up front, for non-interactive exports.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::{PageConfiguration, PageConfigurationStore};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read plan {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid plan {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Plan entry for page {page} is out of range (1-{total})")]
    PageOutOfRange { page: usize, total: usize },

    #[error("Plan assigns page {0} more than once")]
    DuplicatePage(usize),
}

/// `{"pages": [{"page": 1, "file_name": "john_id", "doc_type": "ID"}]}`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub pages: Vec<PlanEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanEntry {
    /// One-based page number.
    pub page: usize,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub doc_type: Option<String>,
}

impl Plan {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write every entry into `store`. The store is untouched if any entry is invalid.
    pub fn apply(&self, store: &mut PageConfigurationStore) -> Result<(), PlanError> {
        let total = store.total_pages();
        let mut seen = vec![false; total];
        for entry in &self.pages {
            if entry.page == 0 || entry.page > total {
                return Err(PlanError::PageOutOfRange {
                    page: entry.page,
                    total,
                });
            }
            if std::mem::replace(&mut seen[entry.page - 1], true) {
                return Err(PlanError::DuplicatePage(entry.page));
            }
        }

        for entry in &self.pages {
            store.set(
                entry.page - 1,
                PageConfiguration {
                    file_name: trimmed(entry.file_name.as_deref()),
                    doc_type: trimmed(entry.doc_type.as_deref()),
                },
            );
        }
        tracing::debug!(entries = self.pages.len(), "Applied plan");
        Ok(())
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Plan {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_apply_sets_listed_pages_only() {
        let plan = parse(
            r#"{"pages": [
                {"page": 1, "file_name": "john_id", "doc_type": "ID"},
                {"page": 3, "file_name": " referral "}
            ]}"#,
        );
        let mut store = PageConfigurationStore::new(3);
        plan.apply(&mut store).unwrap();

        assert_eq!(
            store.configuration_at(0),
            Some(&PageConfiguration::new("john_id", "ID"))
        );
        assert!(store.configuration_at(1).unwrap().is_unset());
        let third = store.configuration_at(2).unwrap();
        assert_eq!(third.file_name.as_deref(), Some("referral"));
        assert_eq!(third.doc_type, None);
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn test_out_of_range_leaves_store_untouched() {
        let plan = parse(
            r#"{"pages": [
                {"page": 1, "file_name": "a", "doc_type": "ID"},
                {"page": 4, "file_name": "b", "doc_type": "ID"}
            ]}"#,
        );
        let mut store = PageConfigurationStore::new(3);
        assert!(matches!(
            plan.apply(&mut store),
            Err(PlanError::PageOutOfRange { page: 4, total: 3 })
        ));
        assert!(store.configuration_at(0).unwrap().is_unset());
    }

    #[test]
    fn test_page_zero_rejected() {
        let plan = parse(r#"{"pages": [{"page": 0, "file_name": "a"}]}"#);
        let mut store = PageConfigurationStore::new(1);
        assert!(plan.apply(&mut store).is_err());
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let plan = parse(r#"{"pages": [{"page": 2}, {"page": 2}]}"#);
        let mut store = PageConfigurationStore::new(2);
        assert!(matches!(
            plan.apply(&mut store),
            Err(PlanError::DuplicatePage(2))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Plan, _> =
            serde_json::from_str(r#"{"pages": [{"page": 1, "name": "a"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{"pages": [{"page": 1, "doc_type": "ID"}]}"#).unwrap();
        let plan = Plan::load(&path).unwrap();
        assert_eq!(plan.pages.len(), 1);
        assert!(matches!(
            Plan::load(dir.path().join("missing.json")),
            Err(PlanError::Read { .. })
        ));
    }
}
