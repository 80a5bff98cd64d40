//! Index handle: owns an open index file, the root/height, and drives
//! flush of an engine's pending node changes back to pages.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::NodeLoader;
use crate::engine::BTreeEngine;
use crate::error::{IndexError, IndexResult};
use crate::scan::{CompareOp, ScanCursor};
use crate::storage::codec::{self, Metadata};
use crate::storage::key::{IndexKey, KeyKind, Rid};
use crate::storage::node::{Node, PageId, NO_PAGE};
use crate::storage::page::{FilePagedFileManager, Page, PagedFileManager, PAGE_SIZE};

const META_PAGE: u32 = 0;

pub struct IndexHandle {
    backend: Arc<FilePagedFileManager>,
    key_kind: KeyKind,
    order: usize,
    root: PageId,
    height: u32,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("key_kind", &self.key_kind)
            .field("root", &self.root)
            .field("height", &self.height)
            .finish()
    }
}

impl IndexHandle {
    /// Opens `path`, creating it (with an empty single-leaf tree) if it
    /// does not already exist.
    pub fn open<P: AsRef<Path>>(path: P, key_kind: KeyKind) -> IndexResult<Self> {
        let path = path.as_ref();
        let order = codec::order_for_page_size(PAGE_SIZE);

        if path.exists() {
            let backend = Arc::new(FilePagedFileManager::open(path, PAGE_SIZE, 64)?);
            let meta_page = backend.read_page(META_PAGE)?;
            let meta = Metadata::decode(&meta_page.data)?;
            debug!(root = meta.root_page, height = meta.height, "opened existing index");
            Ok(IndexHandle {
                backend,
                key_kind: meta.key_kind,
                order,
                root: meta.root_page as PageId,
                height: meta.height,
            })
        } else {
            let backend = Arc::new(FilePagedFileManager::create(path, PAGE_SIZE, 64)?);
            let meta_num = backend.append_page()?;
            debug_assert_eq!(meta_num, META_PAGE);
            let root_num = backend.append_page()?;

            let root_node = Node::new_leaf(root_num as PageId);
            backend.write_page(root_num, &Page {
                data: codec::encode_node(&root_node, PAGE_SIZE),
            })?;

            let meta = Metadata {
                key_kind,
                root_page: root_num,
                height: 0,
                free_page_hint: NO_PAGE as u32,
            };
            backend.write_page(META_PAGE, &Page {
                data: meta.encode(PAGE_SIZE),
            })?;
            backend.sync()?;

            info!(path = %path.display(), "created new index file");
            Ok(IndexHandle {
                backend,
                key_kind,
                order,
                root: root_num as PageId,
                height: 0,
            })
        }
    }

    pub fn close(&self) -> IndexResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    pub fn key_kind(&self) -> KeyKind {
        self.key_kind
    }

    fn loader(&self) -> NodeLoader<'static> {
        let backend = Arc::clone(&self.backend);
        let key_kind = self.key_kind;
        let order = self.order;
        Box::new(move |page_id| {
            if page_id < 0 {
                return Err(IndexError::InvalidOperation(format!(
                    "attempted to load unflushed placeholder page {page_id}"
                )));
            }
            let page = backend.read_page(page_id as u32)?;
            codec::decode_node(&page.data, page_id as u32, key_kind, order)
        })
    }

    fn engine(&self) -> BTreeEngine<'static> {
        BTreeEngine::new(self.loader(), self.order, self.root, self.height)
    }

    pub fn insert_entry(&mut self, key: IndexKey, rid: Rid) -> IndexResult<()> {
        let mut engine = self.engine();
        engine.insert(key, rid)?;
        self.flush(engine)
    }

    pub fn delete_entry(&mut self, key: IndexKey, rid: Rid) -> IndexResult<()> {
        let mut engine = self.engine();
        engine.delete(key, rid)?;
        self.flush(engine)
    }

    pub fn search(&self, key: &IndexKey) -> IndexResult<bool> {
        let mut engine = self.engine();
        let (leaf, idx) = engine.search(key)?;
        let entries = engine.leaf_entries(leaf)?;
        Ok(idx < entries.len() && entries[idx].key == *key)
    }

    pub fn open_scan(&self, op: CompareOp, value: Option<IndexKey>) -> IndexResult<ScanCursor<'_>> {
        ScanCursor::open(self.engine(), op, value)
    }

    /// Write-back order per the concurrency model: newly allocated nodes
    /// first (so page numbers exist), then modified existing nodes, then
    /// page frees, then the metadata page.
    fn flush(&mut self, mut engine: BTreeEngine<'_>) -> IndexResult<()> {
        let root_changed = engine.root() != self.root;
        let height_changed = engine.height() != self.height;

        let pending_alloc: Vec<PageId> = engine.cache.updated_pages().filter(|&p| p < 0).collect();
        let mut remap: HashMap<PageId, PageId> = HashMap::new();
        for temp_id in pending_alloc {
            let real = self.backend.append_page()?;
            remap.insert(temp_id, real as PageId);
        }
        if !remap.is_empty() {
            engine.cache.remap(&remap);
        }
        let new_root = *remap.get(&engine.root()).unwrap_or(&engine.root());

        let updated: Vec<PageId> = engine.cache.updated_pages().collect();
        for page_id in updated {
            let node = engine.cache.node(page_id).expect("updated node must be in cache");
            let bytes = codec::encode_node(node, PAGE_SIZE);
            self.backend.write_page(page_id as u32, &Page { data: bytes })?;
        }

        let deleted: Vec<PageId> = engine.cache.deleted_pages().collect();
        // This core tracks only a free-page hint (the most recently freed
        // page); it does not maintain a reusable free list, since the
        // paged file manager contract exposes no page-free operation.
        let free_hint = deleted.last().map(|&p| p as u32).unwrap_or(NO_PAGE as u32);

        if root_changed || height_changed || !deleted.is_empty() {
            self.root = new_root;
            self.height = engine.height();
            let meta = Metadata {
                key_kind: self.key_kind,
                root_page: self.root as u32,
                height: self.height,
                free_page_hint: free_hint,
            };
            self.backend
                .write_page(META_PAGE, &Page { data: meta.encode(PAGE_SIZE) })?;
            if root_changed || height_changed {
                info!(root = self.root, height = self.height, "tree shape changed");
            }
        }

        engine.cache.clear_pending();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_empty_tree_then_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");

        let mut handle = IndexHandle::open(&path, KeyKind::Int).unwrap();
        handle.insert_entry(IndexKey::Int(1), Rid::new(1, 1)).unwrap();
        handle.insert_entry(IndexKey::Int(2), Rid::new(1, 2)).unwrap();
        handle.close().unwrap();
        drop(handle);

        let reopened = IndexHandle::open(&path, KeyKind::Int).unwrap();
        assert!(reopened.search(&IndexKey::Int(1)).unwrap());
        assert!(reopened.search(&IndexKey::Int(2)).unwrap());
        assert!(!reopened.search(&IndexKey::Int(3)).unwrap());
    }

    #[test]
    fn insert_duplicate_entry_fails_with_key_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut handle = IndexHandle::open(&path, KeyKind::Int).unwrap();
        handle.insert_entry(IndexKey::Int(1), Rid::new(1, 1)).unwrap();
        let err = handle.insert_entry(IndexKey::Int(1), Rid::new(1, 1)).unwrap_err();
        assert!(matches!(err, IndexError::KeyExists));
    }

    #[test]
    fn delete_missing_entry_fails_with_record_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut handle = IndexHandle::open(&path, KeyKind::Int).unwrap();
        let err = handle.delete_entry(IndexKey::Int(9), Rid::new(1, 1)).unwrap_err();
        assert!(matches!(err, IndexError::RecordNotFound));
    }

    #[test]
    fn survives_enough_inserts_to_split_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut handle = IndexHandle::open(&path, KeyKind::Int).unwrap();
        for i in 0..500 {
            handle.insert_entry(IndexKey::Int(i), Rid::new(1, i as u32)).unwrap();
        }
        handle.close().unwrap();
        drop(handle);

        let reopened = IndexHandle::open(&path, KeyKind::Int).unwrap();
        for i in 0..500 {
            assert!(reopened.search(&IndexKey::Int(i)).unwrap(), "missing key {i}");
        }
    }
}
