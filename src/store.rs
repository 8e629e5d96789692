//! Per-page configuration and the current-page cursor.

use serde::Serialize;

/// Shown in place of an unset file name.
pub const FILE_NAME_PLACEHOLDER: &str = "Enter file name";

/// Shown in place of an unset document type.
pub const DOC_TYPE_PLACEHOLDER: &str = "Choose file type";

/// Destination file name and document type chosen for one page.
/// `None` means the user has not provided the field yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageConfiguration {
    pub file_name: Option<String>,
    pub doc_type: Option<String>,
}

impl PageConfiguration {
    #[cfg(test)]
    pub fn new(file_name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        PageConfiguration {
            file_name: Some(file_name.into()),
            doc_type: Some(doc_type.into()),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.file_name.is_none() && self.doc_type.is_none()
    }

    pub fn display_file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(FILE_NAME_PLACEHOLDER)
    }

    pub fn display_doc_type(&self) -> &str {
        self.doc_type.as_deref().unwrap_or(DOC_TYPE_PLACEHOLDER)
    }
}

static UNSET: PageConfiguration = PageConfiguration {
    file_name: None,
    doc_type: None,
};

/// One [`PageConfiguration`] per page plus the currently selected page.
///
/// `configurations.len()` always equals the page count, and the current index
/// stays in `[0, page_count)` whenever the document has pages. Navigation past
/// either end clamps instead of failing.
#[derive(Debug, Clone, Default)]
pub struct PageConfigurationStore {
    configurations: Vec<PageConfiguration>,
    current: usize,
}

impl PageConfigurationStore {
    pub fn new(total_pages: usize) -> Self {
        let mut store = Self::default();
        store.initialize(total_pages);
        store
    }

    /// Discard all records and allocate `total_pages` unset ones.
    pub fn initialize(&mut self, total_pages: usize) {
        self.configurations = vec![PageConfiguration::default(); total_pages];
        self.current = 0;
    }

    pub fn total_pages(&self) -> usize {
        self.configurations.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn configuration_at(&self, index: usize) -> Option<&PageConfiguration> {
        self.configurations.get(index)
    }

    pub fn current(&self) -> Option<&PageConfiguration> {
        self.configuration_at(self.current)
    }

    /// The current record, or an unset one when the store is empty.
    pub fn current_or_unset(&self) -> &PageConfiguration {
        self.current().unwrap_or(&UNSET)
    }

    /// Write the given fields into the record for the current page.
    ///
    /// A field passed as blank text goes back to unset.
    pub fn update_current(&mut self, file_name: Option<&str>, doc_type: Option<&str>) {
        let Some(record) = self.configurations.get_mut(self.current) else {
            return;
        };
        if let Some(name) = file_name {
            record.file_name = non_blank(name);
        }
        if let Some(kind) = doc_type {
            record.doc_type = non_blank(kind);
        }
        tracing::trace!(page = self.current + 1, ?record, "Updated page configuration");
    }

    pub fn next(&mut self) -> usize {
        if self.current + 1 < self.total_pages() {
            self.current += 1;
        }
        self.current
    }

    pub fn previous(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Move to `requested` (zero-based), clamped to the valid range.
    pub fn jump_to(&mut self, requested: i64) -> usize {
        let last = self.total_pages().saturating_sub(1);
        let clamped = if requested < 0 {
            0
        } else {
            usize::try_from(requested).map_or(last, |r| r.min(last))
        };
        if clamped as i64 != requested {
            tracing::debug!(requested, clamped, "Jump target out of range, clamped");
        }
        self.current = clamped;
        self.current
    }

    /// Revert every record to unset and return to the first page.
    pub fn reset_all(&mut self) {
        self.configurations.fill(PageConfiguration::default());
        self.current = 0;
    }

    /// A frozen copy of every record, for handing to an export task.
    pub fn snapshot(&self) -> Vec<PageConfiguration> {
        self.configurations.clone()
    }

    pub fn configurations(&self) -> &[PageConfiguration] {
        &self.configurations
    }

    /// Replace the record at `index` without moving the cursor.
    pub fn set(&mut self, index: usize, config: PageConfiguration) -> bool {
        match self.configurations.get_mut(index) {
            Some(slot) => {
                *slot = config;
                true
            }
            None => false,
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_all_unset() {
        let store = PageConfigurationStore::new(5);
        assert_eq!(store.current_index(), 0);
        assert_eq!(store.total_pages(), 5);
        assert!(store.configurations().iter().all(PageConfiguration::is_unset));
    }

    #[test]
    fn test_next_and_previous_clamp() {
        let mut store = PageConfigurationStore::new(3);
        assert_eq!(store.previous(), 0);
        assert_eq!(store.next(), 1);
        assert_eq!(store.next(), 2);
        assert_eq!(store.next(), 2);
        assert_eq!(store.previous(), 1);
        assert_eq!(store.previous(), 0);
        assert_eq!(store.previous(), 0);
    }

    #[test]
    fn test_navigation_stays_in_range() {
        let mut store = PageConfigurationStore::new(4);
        let moves = [1, 1, 1, 1, 1, -1, 1, -1, -1, -1, -1, -1, 1];
        for step in moves {
            let before = store.current_index();
            let after = if step > 0 { store.next() } else { store.previous() };
            assert!(after < 4);
            assert!(before.abs_diff(after) <= 1);
        }
    }

    #[test]
    fn test_jump_to_clamps() {
        let mut store = PageConfigurationStore::new(10);
        assert_eq!(store.jump_to(-5), 0);
        assert_eq!(store.jump_to(999), 9);
        assert_eq!(store.jump_to(4), 4);
        assert_eq!(store.jump_to(i64::MAX), 9);
        assert_eq!(store.jump_to(i64::MIN), 0);
    }

    #[test]
    fn test_update_current_only_touches_current_page() {
        let mut store = PageConfigurationStore::new(3);
        store.next();
        store.update_current(Some("john_id"), Some("ID"));
        store.next();
        store.update_current(Some("other"), None);

        assert_eq!(
            store.configuration_at(1),
            Some(&PageConfiguration::new("john_id", "ID"))
        );
        let third = store.configuration_at(2).unwrap();
        assert_eq!(third.file_name.as_deref(), Some("other"));
        assert_eq!(third.doc_type, None);
        assert!(store.configuration_at(0).unwrap().is_unset());
    }

    #[test]
    fn test_blank_update_unsets_field() {
        let mut store = PageConfigurationStore::new(1);
        store.update_current(Some("  name "), Some("ID"));
        assert_eq!(store.current().unwrap().file_name.as_deref(), Some("name"));
        store.update_current(Some("   "), None);
        assert_eq!(store.current().unwrap().file_name, None);
        assert_eq!(store.current().unwrap().doc_type.as_deref(), Some("ID"));
    }

    #[test]
    fn test_placeholder_text_is_a_real_value() {
        let mut store = PageConfigurationStore::new(1);
        store.update_current(Some(FILE_NAME_PLACEHOLDER), None);
        assert_eq!(
            store.current().unwrap().file_name.as_deref(),
            Some(FILE_NAME_PLACEHOLDER)
        );
        assert!(!store.current().unwrap().is_unset());
    }

    #[test]
    fn test_reset_all() {
        let mut store = PageConfigurationStore::new(4);
        for _ in 0..4 {
            store.update_current(Some("x"), Some("ID"));
            store.next();
        }
        store.reset_all();
        assert_eq!(store.total_pages(), 4);
        assert_eq!(store.current_index(), 0);
        assert!(store.configurations().iter().all(PageConfiguration::is_unset));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = PageConfigurationStore::new(2);
        store.update_current(Some("a"), Some("ID"));
        let snapshot = store.snapshot();
        store.update_current(Some("b"), None);
        assert_eq!(snapshot[0].file_name.as_deref(), Some("a"));
    }

    #[test]
    fn test_empty_store() {
        let mut store = PageConfigurationStore::new(0);
        assert_eq!(store.next(), 0);
        assert_eq!(store.jump_to(3), 0);
        store.update_current(Some("x"), None);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_display_placeholders() {
        let config = PageConfiguration::default();
        assert_eq!(config.display_file_name(), FILE_NAME_PLACEHOLDER);
        assert_eq!(config.display_doc_type(), DOC_TYPE_PLACEHOLDER);
    }
}
