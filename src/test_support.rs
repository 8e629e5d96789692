//! Fixture PDFs built in memory for unit tests.

use crate::pdf::PdfDocument;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

/// Build a document with `pages` pages; page `i` draws the text `page-i`.
pub fn fixture_document(pages: usize) -> PdfDocument {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(pages);
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("page-{i}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode fixture content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    PdfDocument {
        doc,
        path: PathBuf::from("fixture.pdf"),
    }
}

/// Write a fixture document to `dir/source.pdf`.
pub fn write_fixture(dir: &Path, pages: usize) -> PathBuf {
    let path = dir.join("source.pdf");
    let mut doc = fixture_document(pages).doc;
    doc.save(&path).expect("save fixture");
    path
}

/// Recover the `page-N` marker drawn by [`fixture_document`].
pub fn page_marker(content: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(content);
    let start = text.find("page-")? + "page-".len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()
}

/// Marker of the only page in a single-page PDF on disk.
pub fn single_page_marker(path: &Path) -> Option<usize> {
    let doc = Document::load(path).ok()?;
    let pages = doc.get_pages();
    if pages.len() != 1 {
        return None;
    }
    let page_id = *pages.values().next()?;
    page_marker(&doc.get_page_content(page_id).ok()?)
}
