use anyhow::{Context, Result};
use std::path::Path;

/// Extract the text of one page (zero-based index) of a PDF on disk.
pub fn page_text<P: AsRef<Path>>(path: P, page: usize) -> Result<String> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF: {}", path.display()))?;

    let mut pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

    if page >= pages.len() {
        anyhow::bail!("Page {} is out of range (1-{})", page + 1, pages.len());
    }

    Ok(pages.swap_remove(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_fixture;

    #[test]
    fn test_page_text_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), 2);
        assert!(page_text(&path, 2).is_err());
    }

    #[test]
    fn test_page_text_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(page_text(dir.path().join("nope.pdf"), 0).is_err());
    }
}
