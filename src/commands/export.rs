use super::page_index;
use crate::config::Settings;
use crate::export::ExportProgress;
use crate::pdf::render::PdfiumRenderer;
use crate::plan::Plan;
use crate::session::Session;
use anyhow::{Context, Result};
use std::path::Path;

pub async fn run<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    input: P,
    output_dir: Q,
    plan: R,
    page: Option<i64>,
    settings: Settings,
) -> Result<()> {
    let plan = Plan::load(plan)?;
    let mut session = Session::open(&input, &output_dir, settings, Box::new(PdfiumRenderer))
        .with_context(|| format!("Cannot start session for {}", input.as_ref().display()))?;
    session.apply_plan(&plan)?;

    if let Some(page) = page {
        let saved = session.save_page(page_index(page)?)?;
        println!("Saved page {} to {}", page, saved.display());
        return Ok(());
    }

    let mut task = session.spawn_save_all();
    let cancel = task.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current page");
            cancel.cancel();
        }
    });

    while let Some(event) = task.next_progress().await {
        match event {
            ExportProgress::Started { total } => println!("Exporting {} page(s)", total),
            ExportProgress::PageWritten { page, path } => {
                println!("  p{} -> {}", page + 1, path.display())
            }
            ExportProgress::PageFailed { page, error } => println!("  p{} FAILED: {}", page + 1, error),
        }
    }
    let result = task.finish().await;
    interrupt.abort();
    let report = result?;

    println!(
        "Exported {} page(s) into {}",
        report.success_count(),
        output_dir.as_ref().display()
    );
    if !report.is_complete() {
        for failure in &report.failures {
            eprintln!("Page {}: {}", failure.page + 1, failure.error);
        }
        anyhow::bail!("{} page(s) failed to export", report.failures.len());
    }

    Ok(())
}
