//! Where each term occurs: (table, column, term) → label and value type.

use crate::error::IndexResult;
use crate::source::{csv_reader, source_error};
use ontoclosure_store::{CatalogEntry, IndexStore};
use std::path::Path;
use std::sync::Arc;

const CATALOG_COLUMNS: [&str; 5] = ["term", "tablename", "colname", "type", "label"];

/// Header positions of the catalog columns, in [`CATALOG_COLUMNS`] order.
fn column_positions(headers: &csv::StringRecord) -> Option<[usize; 5]> {
    let mut positions = [0; 5];
    for (slot, name) in positions.iter_mut().zip(CATALOG_COLUMNS) {
        *slot = headers.iter().position(|h| h.eq_ignore_ascii_case(name))?;
    }
    Some(positions)
}

fn catalog_entry(record: &csv::StringRecord, positions: &[usize; 5]) -> Option<CatalogEntry> {
    let [term, table, column, kind, label] = positions.map(|i| record.get(i));
    let (term, table, column) = (term?, table?, column?);
    if term.is_empty() || table.is_empty() || column.is_empty() {
        return None;
    }
    Some(CatalogEntry::new(
        table,
        column,
        term,
        label.unwrap_or_default(),
        kind.unwrap_or_default(),
    ))
}

pub struct TermCatalog {
    store: Arc<dyn IndexStore>,
}

impl TermCatalog {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Upsert every row of a `term,tablename,colname,type,label` CSV.
    /// Returns the number of entries written.
    pub fn import_csv(&self, path: &Path) -> IndexResult<usize> {
        let mut reader = csv_reader(path)?;
        let headers = reader.headers().map_err(|e| source_error(path, e))?.clone();
        let positions = column_positions(&headers).ok_or_else(|| {
            source_error(
                path,
                format!("expected columns {}", CATALOG_COLUMNS.join(",")),
            )
        })?;

        let mut entries = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| source_error(path, e))?;
            match catalog_entry(&record, &positions) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(row = idx + 1, "skipping malformed catalog row"),
            }
        }
        let written = entries.len();
        self.store.put_catalog(entries)?;
        self.store.flush()?;
        Ok(written)
    }

    pub fn by_term(&self, term: &str) -> IndexResult<Vec<CatalogEntry>> {
        Ok(self.store.catalog_by_term(term)?)
    }

    pub fn by_table(&self, table_name: &str) -> IndexResult<Vec<CatalogEntry>> {
        Ok(self.store.catalog_by_table(table_name)?)
    }
}
