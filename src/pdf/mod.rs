pub mod document;
pub mod render;
pub mod text;

pub use document::{DocumentError, PdfDocument};
