//! Turning configured pages into single-page PDF files on disk.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::background::CancellationToken;
use crate::config::{CategoryMap, ExportPolicy, Settings};
use crate::pdf::{DocumentError, PdfDocument};
use crate::store::PageConfiguration;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(
        "{}",
        describe_validation(missing_file_name, missing_doc_type, invalid_file_name, duplicate_destination)
    )]
    Validation {
        missing_file_name: Vec<usize>,
        missing_doc_type: Vec<usize>,
        invalid_file_name: Vec<usize>,
        /// Pages that would write the same `<folder>/<file name>.pdf` as another page.
        duplicate_destination: Vec<usize>,
    },

    #[error("Page {}: unknown document type '{doc_type}'", page + 1)]
    UnknownCategory { page: usize, doc_type: String },

    #[error("Page {}: '{file_name}' is not a valid file name", page + 1)]
    InvalidFileName { page: usize, file_name: String },

    #[error("Page {} is out of range (1-{total})", page + 1)]
    PageOutOfRange { page: usize, total: usize },

    #[error("Page {}: failed to write '{file_name}' ({category})", page + 1)]
    WriteFailure {
        page: usize,
        file_name: String,
        category: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Export cancelled after {written} page(s)")]
    Cancelled { written: usize },
}

impl ExportError {
    /// Validation failure for a single page record.
    pub(crate) fn for_record(page: usize, record: &PageConfiguration, categories: &CategoryMap) -> Self {
        let missing_name = record.file_name.as_deref().map_or(true, str::is_empty);
        let missing_type = record
            .doc_type
            .as_deref()
            .map_or(true, |t| !categories.contains(t));
        ExportError::Validation {
            missing_file_name: if missing_name { vec![page] } else { vec![] },
            missing_doc_type: if missing_type { vec![page] } else { vec![] },
            invalid_file_name: vec![],
            duplicate_destination: vec![],
        }
    }
}

fn describe_validation(
    names: &[usize],
    types: &[usize],
    invalid: &[usize],
    duplicates: &[usize],
) -> String {
    let one_based = |pages: &[usize]| {
        pages
            .iter()
            .map(|p| (p + 1).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut parts = Vec::new();
    if !names.is_empty() {
        parts.push(format!("missing file name on page(s) {}", one_based(names)));
    }
    if !types.is_empty() {
        parts.push(format!("missing document type on page(s) {}", one_based(types)));
    }
    if !invalid.is_empty() {
        parts.push(format!("invalid file name on page(s) {}", one_based(invalid)));
    }
    if !duplicates.is_empty() {
        parts.push(format!(
            "same destination file on page(s) {}",
            one_based(duplicates)
        ));
    }
    format!("Pages not ready for export: {}", parts.join("; "))
}

/// Names that are safe as a single path component on common filesystems.
fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^[^/\\:*?"<>|\x00-\x1f]+$"#).expect("file name pattern is valid")
    })
}

pub fn is_valid_file_name(name: &str) -> bool {
    name != "." && name != ".." && file_name_pattern().is_match(name)
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedPage {
    pub page: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    pub page: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub written: Vec<ExportedPage>,
    pub failures: Vec<PageFailure>,
}

impl ExportReport {
    pub fn success_count(&self) -> usize {
        self.written.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Events published while exporting a whole document.
#[derive(Debug, Clone)]
pub enum ExportProgress {
    Started { total: usize },
    PageWritten { page: usize, path: PathBuf },
    PageFailed { page: usize, error: String },
}

pub struct ExportCoordinator {
    categories: CategoryMap,
    policy: ExportPolicy,
    create_missing_dirs: bool,
}

impl ExportCoordinator {
    pub fn new(settings: Settings) -> Self {
        ExportCoordinator {
            categories: settings.categories,
            policy: settings.policy,
            create_missing_dirs: settings.create_missing_dirs,
        }
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// True iff the record has a non-empty file name and a known document type.
    pub fn is_configured(&self, record: &PageConfiguration) -> bool {
        let has_name = record.file_name.as_deref().is_some_and(|n| !n.is_empty());
        let has_type = record
            .doc_type
            .as_deref()
            .is_some_and(|t| self.categories.contains(t));
        has_name && has_type
    }

    /// Check every record; nothing is written when this fails.
    pub fn validate(&self, configs: &[PageConfiguration]) -> Result<(), ExportError> {
        let mut missing_file_name = Vec::new();
        let mut missing_doc_type = Vec::new();
        let mut invalid_file_name = Vec::new();
        let mut destinations: HashMap<(&str, &str), Vec<usize>> = HashMap::new();

        for (page, record) in configs.iter().enumerate() {
            let name = match record.file_name.as_deref() {
                None | Some("") => {
                    missing_file_name.push(page);
                    None
                }
                Some(name) if !is_valid_file_name(name) => {
                    invalid_file_name.push(page);
                    None
                }
                Some(name) => Some(name),
            };
            let folder = record
                .doc_type
                .as_deref()
                .and_then(|t| self.categories.folder_for(t));
            if folder.is_none() {
                missing_doc_type.push(page);
            }
            if let (Some(folder), Some(name)) = (folder, name) {
                destinations.entry((folder, name)).or_default().push(page);
            }
        }

        let mut duplicate_destination: Vec<usize> = destinations
            .into_values()
            .filter(|pages| pages.len() > 1)
            .flatten()
            .collect();
        duplicate_destination.sort_unstable();

        if missing_file_name.is_empty()
            && missing_doc_type.is_empty()
            && invalid_file_name.is_empty()
            && duplicate_destination.is_empty()
        {
            return Ok(());
        }
        Err(ExportError::Validation {
            missing_file_name,
            missing_doc_type,
            invalid_file_name,
            duplicate_destination,
        })
    }

    /// Write page `page` of `document` to `output_folder/<subfolder>/<file_name>.pdf`.
    pub fn export_one(
        &self,
        page: usize,
        record: &PageConfiguration,
        document: &PdfDocument,
        output_folder: &Path,
    ) -> Result<PathBuf, ExportError> {
        let (Some(file_name), Some(doc_type)) =
            (record.file_name.as_deref(), record.doc_type.as_deref())
        else {
            return Err(ExportError::for_record(page, record, &self.categories));
        };
        if file_name.is_empty() {
            return Err(ExportError::for_record(page, record, &self.categories));
        }

        let folder = self
            .categories
            .folder_for(doc_type)
            .ok_or_else(|| ExportError::UnknownCategory {
                page,
                doc_type: doc_type.to_string(),
            })?;

        if !is_valid_file_name(file_name) {
            return Err(ExportError::InvalidFileName {
                page,
                file_name: file_name.to_string(),
            });
        }

        let write_failure = |source: std::io::Error| ExportError::WriteFailure {
            page,
            file_name: file_name.to_string(),
            category: doc_type.to_string(),
            source,
        };

        let mut single = document.extract_page(page).map_err(|e| match e {
            DocumentError::PageOutOfRange { index, total } => ExportError::PageOutOfRange {
                page: index,
                total,
            },
            other => write_failure(std::io::Error::other(other.to_string())),
        })?;

        let dir = output_folder.join(folder);
        if self.create_missing_dirs && !dir.is_dir() {
            std::fs::create_dir_all(&dir).map_err(write_failure)?;
            debug!(dir = %dir.display(), "Created category folder");
        }

        let destination = dir.join(format!("{file_name}.pdf"));
        if destination.exists() {
            warn!(path = %destination.display(), "Overwriting existing file");
        }

        PdfDocument::save(&mut single, &destination).map_err(write_failure)?;
        info!(page = page + 1, path = %destination.display(), "Exported page");
        Ok(destination)
    }

    /// Validate every page, then export them in order.
    pub fn export_all(
        &self,
        configs: &[PageConfiguration],
        document: &PdfDocument,
        output_folder: &Path,
    ) -> Result<ExportReport, ExportError> {
        self.export_all_with(
            configs,
            document,
            output_folder,
            &CancellationToken::new(),
            |_| {},
        )
    }

    /// [`export_all`](Self::export_all) with cooperative cancellation between
    /// pages and a progress callback.
    pub fn export_all_with(
        &self,
        configs: &[PageConfiguration],
        document: &PdfDocument,
        output_folder: &Path,
        cancel: &CancellationToken,
        mut progress: impl FnMut(ExportProgress),
    ) -> Result<ExportReport, ExportError> {
        self.validate(configs)?;

        let total = configs.len();
        progress(ExportProgress::Started { total });

        let mut report = ExportReport::default();
        for (page, record) in configs.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(written = report.success_count(), "Export cancelled");
                return Err(ExportError::Cancelled {
                    written: report.success_count(),
                });
            }

            match self.export_one(page, record, document, output_folder) {
                Ok(path) => {
                    progress(ExportProgress::PageWritten {
                        page,
                        path: path.clone(),
                    });
                    report.written.push(ExportedPage { page, path });
                }
                Err(e) => {
                    warn!(page = page + 1, error = %e, "Page export failed");
                    progress(ExportProgress::PageFailed {
                        page,
                        error: e.to_string(),
                    });
                    match self.policy {
                        ExportPolicy::FailFast => return Err(e),
                        ExportPolicy::BestEffort => report.failures.push(PageFailure {
                            page,
                            error: format!("{:#}", anyhow::Error::from(e)),
                        }),
                    }
                }
            }
        }

        info!(
            written = report.success_count(),
            failed = report.failures.len(),
            "Export finished"
        );
        Ok(report)
    }
}
