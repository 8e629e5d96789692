use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// US Letter, used when a page carries no usable MediaBox.
const FALLBACK_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to open PDF: {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("PDF has no pages: {}", path.display())]
    Empty { path: PathBuf },

    #[error("Page {} is out of range (1-{total})", index + 1)]
    PageOutOfRange { index: usize, total: usize },
}

/// A loaded source PDF. Pages are addressed by zero-based index.
pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref().to_path_buf();
        let doc = Document::load(&path).map_err(|source| DocumentError::Open {
            path: path.clone(),
            source,
        })?;
        if doc.get_pages().is_empty() {
            return Err(DocumentError::Empty { path });
        }
        tracing::debug!(path = %path.display(), pages = doc.get_pages().len(), "Opened PDF");
        Ok(PdfDocument { doc, path })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Object IDs in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, DocumentError> {
        let total = self.page_count();
        self.page_ids()
            .get(index)
            .copied()
            .ok_or(DocumentError::PageOutOfRange { index, total })
    }

    /// Get metadata from the document info dictionary
    pub fn get_info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        if let Ok(Object::Reference(info_ref)) = self.doc.trailer.get(b"Info") {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object(*info_ref) {
                info.title = get_string_from_dict(dict, b"Title");
                info.author = get_string_from_dict(dict, b"Author");
                info.creator = get_string_from_dict(dict, b"Creator");
                info.producer = get_string_from_dict(dict, b"Producer");
                info.creation_date = get_string_from_dict(dict, b"CreationDate");
            }
        }

        info.page_count = self.page_count();
        info
    }

    /// Width and height of a page in PDF points, following inherited MediaBox entries.
    pub fn page_size(&self, index: usize) -> Result<(f32, f32), DocumentError> {
        let mut current = Some(self.page_id(index)?);
        while let Some(id) = current {
            let Ok(dict) = self.doc.get_dictionary(id) else {
                break;
            };
            if let Some(size) = dict.get(b"MediaBox").ok().and_then(|b| self.box_size(b)) {
                return Ok(size);
            }
            current = match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => Some(*parent),
                _ => None,
            };
        }
        Ok(FALLBACK_PAGE_SIZE)
    }

    fn box_size(&self, obj: &Object) -> Option<(f32, f32)> {
        let obj = match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok()?,
            other => other,
        };
        let coords: Vec<f32> = obj
            .as_array()
            .ok()?
            .iter()
            .filter_map(|o| o.as_float().ok())
            .collect();
        match coords.as_slice() {
            [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => None,
        }
    }

    /// Extract a single page into a new, standalone document
    pub fn extract_page(&self, index: usize) -> Result<Document, DocumentError> {
        let total = self.page_count();
        if index >= total {
            return Err(DocumentError::PageOutOfRange { index, total });
        }

        let keep = index as u32 + 1;
        let pages_to_delete: Vec<u32> = (1..=total as u32).filter(|&n| n != keep).collect();

        let mut new_doc = self.doc.clone();
        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
            new_doc.prune_objects();
        }

        Ok(new_doc)
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> std::io::Result<()> {
        doc.save(&path).map_err(std::io::Error::other)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub page_count: usize,
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // UTF-16 BE with BOM, otherwise treat as PDFDocEncoding (approximated by Latin-1)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_document, page_marker};

    #[test]
    fn test_page_count() {
        let doc = fixture_document(4);
        assert_eq!(doc.page_count(), 4);
        assert_eq!(doc.page_ids().len(), 4);
    }

    #[test]
    fn test_extract_page_keeps_only_requested_page() {
        let doc = fixture_document(3);
        let extracted = doc.extract_page(1).unwrap();
        let pages = extracted.get_pages();
        assert_eq!(pages.len(), 1);
        let (_, page_id) = pages.into_iter().next().unwrap();
        let content = extracted.get_page_content(page_id).unwrap();
        assert_eq!(page_marker(&content), Some(1));
    }

    #[test]
    fn test_extract_page_out_of_range() {
        let doc = fixture_document(2);
        assert!(matches!(
            doc.extract_page(2),
            Err(DocumentError::PageOutOfRange { index: 2, total: 2 })
        ));
    }

    #[test]
    fn test_page_size_inherited_from_pages_node() {
        let doc = fixture_document(1);
        assert_eq!(doc.page_size(0).unwrap(), (595.0, 842.0));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PdfDocument::open(dir.path().join("missing.pdf"));
        assert!(matches!(result, Err(DocumentError::Open { .. })));
    }

    #[test]
    fn test_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.pdf");
        let mut doc = fixture_document(2).doc;
        PdfDocument::save(&mut doc, &path).unwrap();
        let reopened = PdfDocument::open(&path).unwrap();
        assert_eq!(reopened.page_count(), 2);
    }

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0x00, b'I', 0x00, b'D'];
        assert_eq!(decode_pdf_string(&bytes).as_deref(), Some("ID"));
    }
}
