use super::page_index;
use crate::pdf::text::page_text;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P, page: i64) -> Result<()> {
    let text = page_text(&path, page_index(page)?)?;
    println!("--- Page {} ---", page);
    println!("{}", text);
    Ok(())
}
