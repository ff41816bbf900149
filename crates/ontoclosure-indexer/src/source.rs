//! Where the distinct terms of a run come from.

use crate::error::{IndexError, IndexResult};
use std::fs::File;
use std::path::{Path, PathBuf};

pub trait TermSource {
    /// Human-readable origin for logs and errors.
    fn origin(&self) -> String;

    fn terms(&self) -> IndexResult<Vec<String>>;
}

/// In-memory list.
#[derive(Debug, Clone, Default)]
pub struct StaticTermSource(pub Vec<String>);

impl TermSource for StaticTermSource {
    fn origin(&self) -> String {
        "static".to_string()
    }

    fn terms(&self) -> IndexResult<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Query-result CSV: a header row, then the term in the first column.
#[derive(Debug, Clone)]
pub struct CsvTermSource {
    path: PathBuf,
}

impl CsvTermSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TermSource for CsvTermSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn terms(&self) -> IndexResult<Vec<String>> {
        let mut reader = csv_reader(&self.path)?;
        let mut terms = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| source_error(&self.path, e))?;
            match record.get(0) {
                Some(term) if !term.is_empty() => terms.push(term.to_string()),
                _ => {}
            }
        }
        Ok(terms)
    }
}

/// Header-aware reader that trims fields and tolerates ragged rows.
pub(crate) fn csv_reader(path: &Path) -> IndexResult<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| source_error(path, e))
}

pub(crate) fn source_error(path: &Path, err: impl std::fmt::Display) -> IndexError {
    IndexError::Source {
        origin: path.display().to_string(),
        message: err.to_string(),
    }
}
