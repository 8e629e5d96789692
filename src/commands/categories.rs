use crate::config::CategoryMap;
use anyhow::Result;
use std::path::Path;

pub fn run(categories: Option<&Path>) -> Result<()> {
    let map = CategoryMap::resolve(categories)?;
    let width = map.labels().map(str::len).max().unwrap_or(0);
    for (label, folder) in map.iter() {
        println!("{:width$}  ->  {}", label, folder, width = width);
    }
    Ok(())
}
