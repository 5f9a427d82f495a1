//! Item source: read descriptor records from CSV or JSON files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::{DEFAULT_CATEGORY, ItemDescriptor};

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn read_csv(path: &Path) -> Result<Vec<ItemDescriptor>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    reader
        .deserialize::<ItemDescriptor>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("{}: record {}", path.display(), i + 1)))
        .collect()
}

fn read_json(path: &Path) -> Result<Vec<ItemDescriptor>> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

/// Read every input in order and concatenate their descriptors. Empty categories become
/// [`DEFAULT_CATEGORY`]. Any unreadable input fails the whole load.
pub fn load_descriptors(inputs: &[PathBuf]) -> Result<Vec<ItemDescriptor>> {
    let mut items = Vec::new();
    for input in inputs {
        let mut batch = if is_json(input) {
            read_json(input)?
        } else {
            read_csv(input)?
        };
        log::debug!("{}: {} descriptors", input.display(), batch.len());
        items.append(&mut batch);
    }
    for item in &mut items {
        if item.category.trim().is_empty() {
            item.category = DEFAULT_CATEGORY.to_string();
        }
    }
    Ok(items)
}
