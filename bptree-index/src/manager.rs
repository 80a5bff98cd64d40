//! Manager facade: `CreateIndex` / `DestroyIndex` / `OpenIndex` / `CloseIndex`,
//! driven by a catalog resolving `(table, attribute)` to a key type and file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IndexError, IndexResult};
use crate::handle::IndexHandle;
use crate::storage::key::KeyKind;

/// Resolves `(table, attribute)` pairs to an attribute's key type and the
/// index file that backs it. Out of the core engine's concern; a minimal
/// in-memory implementation is provided so the manager is runnable without
/// a full relational catalog.
pub trait Catalog {
    fn resolve(&self, table: &str, attribute: &str) -> IndexResult<KeyKind>;
    fn index_file_name(&self, table: &str, attribute: &str) -> String {
        format!("{table}.{attribute}.idx")
    }
}

pub struct InMemoryCatalog {
    attributes: HashMap<(String, String), KeyKind>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        InMemoryCatalog { attributes: HashMap::new() }
    }

    pub fn register(&mut self, table: &str, attribute: &str, kind: KeyKind) {
        self.attributes.insert((table.to_string(), attribute.to_string()), kind);
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve(&self, table: &str, attribute: &str) -> IndexResult<KeyKind> {
        self.attributes
            .get(&(table.to_string(), attribute.to_string()))
            .copied()
            .ok_or_else(|| IndexError::AttributeNotFound {
                table: table.to_string(),
                attribute: attribute.to_string(),
            })
    }
}

/// `IX_Manager`-equivalent facade over a directory of index files.
pub struct IndexManager<C: Catalog> {
    root_dir: PathBuf,
    catalog: C,
}

impl<C: Catalog> IndexManager<C> {
    pub fn new<P: AsRef<Path>>(root_dir: P, catalog: C) -> Self {
        IndexManager {
            root_dir: root_dir.as_ref().to_path_buf(),
            catalog,
        }
    }

    fn path_for(&self, table: &str, attribute: &str) -> PathBuf {
        self.root_dir.join(self.catalog.index_file_name(table, attribute))
    }

    pub fn create_index(&self, table: &str, attribute: &str) -> IndexResult<()> {
        let key_kind = self.catalog.resolve(table, attribute)?;
        let path = self.path_for(table, attribute);
        if path.exists() {
            return Err(IndexError::FileExists(path));
        }
        let handle = IndexHandle::open(&path, key_kind)?;
        handle.close()?;
        info!(table, attribute, "created index");
        Ok(())
    }

    pub fn destroy_index(&self, table: &str, attribute: &str) -> IndexResult<()> {
        let path = self.path_for(table, attribute);
        if !path.exists() {
            return Err(IndexError::FileNotFound(path));
        }
        std::fs::remove_file(&path)?;
        info!(table, attribute, "destroyed index");
        Ok(())
    }

    pub fn open_index(&self, table: &str, attribute: &str) -> IndexResult<IndexHandle> {
        let key_kind = self.catalog.resolve(table, attribute)?;
        let path = self.path_for(table, attribute);
        if !path.exists() {
            return Err(IndexError::FileNotFound(path));
        }
        IndexHandle::open(&path, key_kind)
    }

    pub fn close_index(&self, handle: IndexHandle) -> IndexResult<()> {
        handle.close()
    }
}
