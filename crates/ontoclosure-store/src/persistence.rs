//! Snapshot-file persistence.
//!
//! The whole index lives in one file. Writes go to the in-memory tables and
//! mark the store dirty; [`IndexStore::flush`] writes a temp file next to the
//! target and renames it over the previous snapshot, so a crash mid-write
//! leaves the last good snapshot in place.

use crate::memory::MemoryStore;
use crate::{
    CatalogEntry, IndexStore, IndexTables, OntologyRecord, StoreError, StoreResult, TermSet,
    INDEX_SNAPSHOT_VERSION_V1,
};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Cbor,
    Json,
}

impl SnapshotFormat {
    /// `.json` snapshots are JSON; everything else is CBOR.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SnapshotFormat::Json,
            _ => SnapshotFormat::Cbor,
        }
    }
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    format: SnapshotFormat,
    inner: MemoryStore,
    dirty: AtomicBool,
}

impl FileStore {
    /// Open the snapshot at `path`, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let format = SnapshotFormat::for_path(&path);
        let tables = if path.exists() {
            read_snapshot(&path, format)?
        } else {
            IndexTables::default()
        };
        tracing::debug!(
            path = %path.display(),
            ancestors = tables.ancestors.len(),
            descendants = tables.descendants.len(),
            "opened index snapshot"
        );
        Ok(Self {
            path,
            format,
            inner: MemoryStore::from_tables(tables),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> IndexTables {
        self.inner.snapshot()
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

impl IndexStore for FileStore {
    fn get_ontology(&self, prefix: &str) -> StoreResult<Option<OntologyRecord>> {
        self.inner.get_ontology(prefix)
    }

    fn put_ontology(&self, record: OntologyRecord) -> StoreResult<()> {
        self.inner.put_ontology(record)?;
        self.mark_dirty();
        Ok(())
    }

    fn get_ancestors(&self, term: &str) -> StoreResult<Option<TermSet>> {
        self.inner.get_ancestors(term)
    }

    fn has_ancestors(&self, term: &str) -> StoreResult<bool> {
        self.inner.has_ancestors(term)
    }

    fn put_ancestors(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()> {
        self.inner.put_ancestors(entries)?;
        self.mark_dirty();
        Ok(())
    }

    fn get_descendants(&self, term: &str) -> StoreResult<Option<TermSet>> {
        self.inner.get_descendants(term)
    }

    fn put_descendants(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()> {
        self.inner.put_descendants(entries)?;
        self.mark_dirty();
        Ok(())
    }

    fn merge_descendants(&self, term: &str, additions: &TermSet) -> StoreResult<()> {
        self.inner.merge_descendants(term, additions)?;
        self.mark_dirty();
        Ok(())
    }

    fn put_catalog(&self, entries: Vec<CatalogEntry>) -> StoreResult<()> {
        self.inner.put_catalog(entries)?;
        self.mark_dirty();
        Ok(())
    }

    fn catalog_by_term(&self, term: &str) -> StoreResult<Vec<CatalogEntry>> {
        self.inner.catalog_by_term(term)
    }

    fn catalog_by_table(&self, table_name: &str) -> StoreResult<Vec<CatalogEntry>> {
        self.inner.catalog_by_table(table_name)
    }

    fn flush(&self) -> StoreResult<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self
            .inner
            .with_tables(|tables| write_snapshot(&self.path, self.format, tables));
        if result.is_err() {
            self.mark_dirty();
        }
        result
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_snapshot(path: &Path, format: SnapshotFormat) -> StoreResult<IndexTables> {
    let f = fs::File::open(path).map_err(|e| io_error(path, e))?;
    let reader = BufReader::new(f);
    let decode_err = |message: String| StoreError::Decode {
        path: path.display().to_string(),
        message,
    };
    let tables: IndexTables = match format {
        SnapshotFormat::Cbor => {
            ciborium::de::from_reader(reader).map_err(|e| decode_err(e.to_string()))?
        }
        SnapshotFormat::Json => {
            serde_json::from_reader(reader).map_err(|e| decode_err(e.to_string()))?
        }
    };
    if tables.version != INDEX_SNAPSHOT_VERSION_V1 {
        return Err(StoreError::Version(tables.version));
    }
    Ok(tables)
}

pub fn write_snapshot(path: &Path, format: SnapshotFormat, tables: &IndexTables) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
    }
    let bytes = match format {
        SnapshotFormat::Cbor => {
            let mut buf = Vec::new();
            ciborium::ser::into_writer(tables, &mut buf)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            buf
        }
        SnapshotFormat::Json => {
            serde_json::to_vec_pretty(tables).map_err(|e| StoreError::Encode(e.to_string()))?
        }
    };
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;
    Ok(())
}
