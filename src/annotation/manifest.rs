//! Whole-file rewrite of line-oriented manifests

use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::types::{AnnotationError, Result};

/// Read all lines of a manifest; a missing file reads as empty.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite `path` keeping the lines for which `keep` returns true, then
/// appending `lines_to_add`.
///
/// The new content goes to a temp file next to the target which is then
/// renamed over it, so readers never observe a half-written manifest.
pub fn rewrite_manifest<F>(path: &Path, lines_to_add: &[String], keep: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    let mut lines: Vec<String> = read_lines(path)?
        .into_iter()
        .filter(|line| keep(line))
        .collect();
    lines.extend(lines_to_add.iter().cloned());

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| AnnotationError::Persist {
        path: path.to_path_buf(),
        message: e.error.to_string(),
    })?;

    Ok(())
}
