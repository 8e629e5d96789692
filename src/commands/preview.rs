use super::page_index;
use crate::pdf::render::{render_preview, PdfiumRenderer};
use crate::pdf::PdfDocument;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(path: P, page: i64, dpi: u32, output: Q) -> Result<()> {
    let doc = PdfDocument::open(&path)?;
    let index = page_index(page)?;
    let preview = render_preview(&PdfiumRenderer, &doc, index, dpi)?;

    std::fs::write(&output, &preview.png)
        .with_context(|| format!("Failed to write {}", output.as_ref().display()))?;

    if preview.placeholder {
        println!(
            "Page {} could not be rendered; wrote a blank placeholder to {}",
            page,
            output.as_ref().display()
        );
    } else {
        println!("Rendered page {} to {}", page, output.as_ref().display());
    }
    Ok(())
}
