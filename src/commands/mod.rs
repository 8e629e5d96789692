pub mod categories;
pub mod export;
pub mod info;
pub mod preview;
pub mod session;
pub mod text;

/// Convert a one-based page number from the command line to an index.
pub fn page_index(page: i64) -> anyhow::Result<usize> {
    if page < 1 {
        anyhow::bail!("Page numbers must be >= 1");
    }
    Ok(usize::try_from(page - 1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_index() {
        assert_eq!(page_index(1).unwrap(), 0);
        assert_eq!(page_index(12).unwrap(), 11);
        assert!(page_index(0).is_err());
        assert!(page_index(-3).is_err());
    }
}
