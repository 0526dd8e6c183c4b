//! Document order of source files
//!
//! Source files are named `<prefix>_<anything>-<suffix>.<ext>`, e.g.
//! `12_scan-3.jpg`. They sort numerically by prefix, then by suffix, so
//! `2_a-9` comes before `2_a-10`.

use std::cmp::Ordering;
use std::path::Path;

use super::types::{PipelineError, Result};

/// Numeric `(prefix, suffix)` sort key of a source filename
pub fn sort_key(filename: &str) -> Result<(u64, u64)> {
    let invalid = || PipelineError::InvalidFilename(filename.to_string());

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(invalid)?;

    let prefix = stem
        .split('_')
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .ok_or_else(invalid)?;
    let suffix = stem
        .rsplit('-')
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .ok_or_else(invalid)?;

    Ok((prefix, suffix))
}

/// Sort filenames into document order.
///
/// Equal keys fall back to the filename so the order is total. The first
/// filename without a valid key fails the whole sort.
pub fn sort_filenames(filenames: Vec<String>) -> Result<Vec<String>> {
    let mut keyed = filenames
        .into_iter()
        .map(|name| sort_key(&name).map(|key| (key, name)))
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(key_a, name_a), (key_b, name_b)| match key_a.cmp(key_b) {
        Ordering::Equal => name_a.cmp(name_b),
        other => other,
    });

    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}
