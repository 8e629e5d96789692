//! Whole-document export off the caller's thread.
//!
//! The task works on a snapshot of the page configurations taken when it is
//! spawned, so edits made while it runs never leak into the files it writes.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::export::{ExportCoordinator, ExportError, ExportProgress, ExportReport};
use crate::pdf::PdfDocument;
use crate::store::PageConfiguration;

/// Cooperative cancellation flag shared between a task and its owner.
///
/// All clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handle to a running export.
pub struct ExportTask {
    cancel: CancellationToken,
    progress: mpsc::UnboundedReceiver<ExportProgress>,
    handle: JoinHandle<Result<ExportReport, ExportError>>,
}

impl ExportTask {
    /// Start exporting `configs` on the blocking thread pool.
    pub fn spawn(
        coordinator: Arc<ExportCoordinator>,
        document: Arc<PdfDocument>,
        configs: Vec<PageConfiguration>,
        output_folder: PathBuf,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (tx, progress) = mpsc::unbounded_channel();

        let token = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            coordinator.export_all_with(&configs, &document, &output_folder, &token, |event| {
                // The receiver may already be gone; the export still runs to completion.
                let _ = tx.send(event);
            })
        });

        ExportTask {
            cancel,
            progress,
            handle,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress event, or `None` once the export has stopped publishing.
    pub async fn next_progress(&mut self) -> Option<ExportProgress> {
        self.progress.recv().await
    }

    /// Wait for the export to finish.
    pub async fn finish(self) -> Result<ExportReport, ExportError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}
