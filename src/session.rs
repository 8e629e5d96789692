//! The live state of one opened document.
//!
//! Front-ends never hold page state themselves; they read from and dispatch
//! to a [`Session`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::background::ExportTask;
use crate::config::{CategoryMap, Settings};
use crate::export::{ExportCoordinator, ExportError, ExportReport};
use crate::pdf::render::{render_preview, PageRenderer, Preview, RenderError};
use crate::pdf::{text, DocumentError, PdfDocument};
use crate::plan::{Plan, PlanError};
use crate::store::{PageConfiguration, PageConfigurationStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Output folder does not exist: {}", path.display())]
    OutputFolder { path: PathBuf },
}

pub struct Session {
    document: Arc<PdfDocument>,
    store: PageConfigurationStore,
    output_folder: PathBuf,
    coordinator: Arc<ExportCoordinator>,
    renderer: Box<dyn PageRenderer>,
}

impl Session {
    /// Open `pdf` and bind it to an existing output folder.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        pdf: P,
        output_folder: Q,
        settings: Settings,
        renderer: Box<dyn PageRenderer>,
    ) -> Result<Self, SessionError> {
        let document = PdfDocument::open(pdf)?;
        Self::with_document(document, output_folder, settings, renderer)
    }

    pub fn with_document<Q: AsRef<Path>>(
        document: PdfDocument,
        output_folder: Q,
        settings: Settings,
        renderer: Box<dyn PageRenderer>,
    ) -> Result<Self, SessionError> {
        if document.page_count() == 0 {
            return Err(DocumentError::Empty {
                path: document.path.clone(),
            }
            .into());
        }
        let output_folder = output_folder.as_ref().to_path_buf();
        if !output_folder.is_dir() {
            return Err(SessionError::OutputFolder {
                path: output_folder,
            });
        }

        let store = PageConfigurationStore::new(document.page_count());
        info!(
            pdf = %document.path.display(),
            pages = store.total_pages(),
            output = %output_folder.display(),
            "Session started"
        );
        Ok(Session {
            document: Arc::new(document),
            store,
            output_folder,
            coordinator: Arc::new(ExportCoordinator::new(settings)),
            renderer,
        })
    }

    /// Replace the document; every page configuration starts over.
    pub fn load_document<P: AsRef<Path>>(&mut self, pdf: P) -> Result<(), SessionError> {
        let document = PdfDocument::open(pdf)?;
        // open() rejects documents without pages, so the cursor stays valid.
        self.store.initialize(document.page_count());
        info!(pdf = %document.path.display(), pages = self.store.total_pages(), "Loaded new document");
        self.document = Arc::new(document);
        Ok(())
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    pub fn categories(&self) -> &CategoryMap {
        self.coordinator.categories()
    }

    pub fn store(&self) -> &PageConfigurationStore {
        &self.store
    }

    pub fn total_pages(&self) -> usize {
        self.store.total_pages()
    }

    pub fn current_index(&self) -> usize {
        self.store.current_index()
    }

    pub fn current(&self) -> &PageConfiguration {
        self.store.current_or_unset()
    }

    pub fn is_current_configured(&self) -> bool {
        self.coordinator.is_configured(self.current())
    }

    pub fn edit(&mut self, file_name: Option<&str>, doc_type: Option<&str>) {
        self.store.update_current(file_name, doc_type);
    }

    pub fn next(&mut self) -> usize {
        self.store.next()
    }

    pub fn previous(&mut self) -> usize {
        self.store.previous()
    }

    /// Jump to a one-based page number, clamped to the document.
    pub fn jump_to_page(&mut self, page_number: i64) -> usize {
        self.store.jump_to(page_number.saturating_sub(1))
    }

    pub fn preview(&self, dpi: u32) -> Result<Preview, RenderError> {
        render_preview(
            self.renderer.as_ref(),
            &self.document,
            self.current_index(),
            dpi,
        )
    }

    pub fn page_text(&self) -> anyhow::Result<String> {
        text::page_text(&self.document.path, self.current_index())
    }

    pub fn apply_plan(&mut self, plan: &Plan) -> Result<(), PlanError> {
        plan.apply(&mut self.store)
    }

    /// Export only the current page.
    pub fn save_current(&self) -> Result<PathBuf, ExportError> {
        let page = self.current_index();
        let record = self.current();
        if !self.coordinator.is_configured(record) {
            return Err(ExportError::for_record(page, record, self.categories()));
        }
        self.coordinator
            .export_one(page, record, &self.document, &self.output_folder)
    }

    /// Export the page at `page` (zero-based) regardless of the cursor.
    pub fn save_page(&self, page: usize) -> Result<PathBuf, ExportError> {
        let record = self
            .store
            .configuration_at(page)
            .ok_or(ExportError::PageOutOfRange {
                page,
                total: self.total_pages(),
            })?;
        if !self.coordinator.is_configured(record) {
            return Err(ExportError::for_record(page, record, self.categories()));
        }
        self.coordinator
            .export_one(page, record, &self.document, &self.output_folder)
    }

    pub fn save_all(&self) -> Result<ExportReport, ExportError> {
        self.coordinator
            .export_all(self.store.configurations(), &self.document, &self.output_folder)
    }

    /// Export every page on a background task, working from a snapshot of the
    /// current configurations.
    pub fn spawn_save_all(&self) -> ExportTask {
        ExportTask::spawn(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.document),
            self.store.snapshot(),
            self.output_folder.clone(),
        )
    }

    pub fn clear_all(&mut self) {
        self.store.reset_all();
        info!("Cleared all page configurations");
    }
}
