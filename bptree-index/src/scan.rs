//! Scan cursor: walks the leaf chain under a comparison predicate.

use tracing::debug;

use crate::engine::BTreeEngine;
use crate::error::{IndexError, IndexResult};
use crate::storage::key::{Entry, IndexKey};
use crate::storage::node::{PageId, NO_PAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    NoOp,
}

/// Holds a `(leaf, position)` pair and the predicate. Not invalidated
/// automatically by concurrent mutation (none is supported, per the
/// single-handle-at-a-time model); a scan simply owns the node cache it
/// reads through for its whole lifetime.
pub struct ScanCursor<'a> {
    engine: BTreeEngine<'a>,
    op: CompareOp,
    value: Option<IndexKey>,
    leaf: PageId,
    index: usize,
    started: bool,
    exhausted: bool,
}

impl<'a> ScanCursor<'a> {
    pub(crate) fn open(mut engine: BTreeEngine<'a>, op: CompareOp, value: Option<IndexKey>) -> IndexResult<Self> {
        let (leaf, index) = match op {
            CompareOp::NoOp | CompareOp::Lt | CompareOp::Le | CompareOp::Ne => {
                (engine.leftmost_leaf()?, 0)
            }
            CompareOp::Eq | CompareOp::Ge | CompareOp::Gt => {
                let key = value.ok_or_else(|| {
                    IndexError::InvalidOperation("EQ/GE/GT scan requires a bound value".into())
                })?;
                engine.search(&key)?
            }
        };
        debug!(?op, ?value, leaf, index, "scan opened");
        Ok(ScanCursor {
            engine,
            op,
            value,
            leaf,
            index,
            started: false,
            exhausted: false,
        })
    }

    fn predicate_holds(&self, entry: &Entry) -> bool {
        let Some(value) = self.value else { return true };
        match self.op {
            CompareOp::NoOp => true,
            CompareOp::Eq => entry.key == value,
            CompareOp::Lt => entry.key < value,
            CompareOp::Le => entry.key <= value,
            CompareOp::Gt => entry.key > value,
            CompareOp::Ge => entry.key >= value,
            CompareOp::Ne => entry.key != value,
        }
    }

    /// Monotone predicates (EQ going up, LT/LE going up to the bound) stop
    /// the scan the moment they first fail rather than running to chain
    /// end; NE/GE/GT/NO_OP must run the whole chain.
    fn is_monotone_cutoff(&self) -> bool {
        matches!(self.op, CompareOp::Eq | CompareOp::Lt | CompareOp::Le)
    }

    /// Advances to and returns the next matching entry, or `Err(ScanExhausted)`
    /// (the externally-visible `IX_EOF`) once the predicate no longer holds.
    pub fn next_entry(&mut self) -> IndexResult<Entry> {
        if self.exhausted {
            return Err(IndexError::ScanExhausted);
        }
        loop {
            if !self.started {
                self.started = true;
            } else {
                self.index += 1;
            }
            let entries = self.engine.leaf_entries(self.leaf)?;
            if self.index >= entries.len() {
                let next = self.engine.leaf_right(self.leaf)?;
                if next == NO_PAGE {
                    self.exhausted = true;
                    debug!(op = ?self.op, "scan exhausted: leaf chain ended");
                    return Err(IndexError::ScanExhausted);
                }
                self.leaf = next;
                self.index = 0;
                self.started = false;
                continue;
            }
            let entry = entries[self.index];
            if self.predicate_holds(&entry) {
                return Ok(entry);
            }
            if self.is_monotone_cutoff() {
                self.exhausted = true;
                debug!(op = ?self.op, "scan exhausted: predicate cutoff");
                return Err(IndexError::ScanExhausted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NodeLoader;
    use crate::error::IndexError;
    use crate::storage::key::Rid;
    use crate::storage::node::Node;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn engine_with(order: usize, keys: &[i32]) -> BTreeEngine<'static> {
        let store: Rc<RefCell<HashMap<PageId, Node>>> = Rc::new(RefCell::new(HashMap::new()));
        store.borrow_mut().insert(0, Node::new_leaf(0));
        let for_loader = Rc::clone(&store);
        let loader: NodeLoader<'static> = Box::new(move |id| {
            for_loader
                .borrow()
                .get(&id)
                .cloned()
                .ok_or_else(|| IndexError::Corrupt(format!("no such page {id}")))
        });
        let mut engine = BTreeEngine::new(loader, order, 0, 0);
        for (i, &k) in keys.iter().enumerate() {
            engine.insert(IndexKey::Int(k), Rid::new(1, i as u32)).unwrap();
        }
        engine
    }

    #[test]
    fn eq_scan_yields_all_duplicates_then_eof() {
        let store: Rc<RefCell<HashMap<PageId, Node>>> = Rc::new(RefCell::new(HashMap::new()));
        store.borrow_mut().insert(0, Node::new_leaf(0));
        let for_loader = Rc::clone(&store);
        let loader: NodeLoader<'static> = Box::new(move |id| {
            for_loader
                .borrow()
                .get(&id)
                .cloned()
                .ok_or_else(|| IndexError::Corrupt(format!("no such page {id}")))
        });
        let mut engine = BTreeEngine::new(loader, 2, 0, 0);
        engine.insert(IndexKey::Int(7), Rid::new(2, 1)).unwrap();
        engine.insert(IndexKey::Int(7), Rid::new(2, 2)).unwrap();

        let mut cursor = ScanCursor::open(engine, CompareOp::Eq, Some(IndexKey::Int(7))).unwrap();
        assert_eq!(cursor.next_entry().unwrap().rid, Rid::new(2, 1));
        assert_eq!(cursor.next_entry().unwrap().rid, Rid::new(2, 2));
        assert!(matches!(cursor.next_entry().unwrap_err(), IndexError::ScanExhausted));
    }

    #[test]
    fn gt_scan_skips_equal_and_returns_ascending_tail() {
        let engine = engine_with(2, &[10, 20, 30, 40, 50]);
        let mut cursor = ScanCursor::open(engine, CompareOp::Gt, Some(IndexKey::Int(20))).unwrap();
        let mut got = Vec::new();
        loop {
            match cursor.next_entry() {
                Ok(e) => got.push(match e.key {
                    IndexKey::Int(v) => v,
                    _ => unreachable!(),
                }),
                Err(IndexError::ScanExhausted) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(got, vec![30, 40, 50]);
    }

    #[test]
    fn float_index_gt_scan_matches_ascending_tail() {
        let store: Rc<RefCell<HashMap<PageId, Node>>> = Rc::new(RefCell::new(HashMap::new()));
        store.borrow_mut().insert(0, Node::new_leaf(0));
        let for_loader = Rc::clone(&store);
        let loader: NodeLoader<'static> = Box::new(move |id| {
            for_loader
                .borrow()
                .get(&id)
                .cloned()
                .ok_or_else(|| IndexError::Corrupt(format!("no such page {id}")))
        });
        let mut engine = BTreeEngine::new(loader, 2, 0, 0);
        for (i, k) in [1.5f32, 2.5, 3.5, 4.5, 5.5].into_iter().enumerate() {
            engine.insert(IndexKey::Float(k), Rid::new(1, i as u32)).unwrap();
        }

        let mut cursor = ScanCursor::open(engine, CompareOp::Gt, Some(IndexKey::Float(2.5))).unwrap();
        let mut got = Vec::new();
        loop {
            match cursor.next_entry() {
                Ok(e) => got.push(match e.key {
                    IndexKey::Float(v) => v,
                    _ => unreachable!(),
                }),
                Err(IndexError::ScanExhausted) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(got, vec![3.5, 4.5, 5.5]);
    }

    #[test]
    fn eq_ge_gt_scan_with_no_bound_value_is_invalid_operation_not_panic() {
        let store: Rc<RefCell<HashMap<PageId, Node>>> = Rc::new(RefCell::new(HashMap::new()));
        store.borrow_mut().insert(0, Node::new_leaf(0));
        let loader: NodeLoader<'static> =
            Box::new(move |id| store.borrow().get(&id).cloned().ok_or_else(|| IndexError::Corrupt(format!("no such page {id}"))));
        let engine = BTreeEngine::new(loader, 2, 0, 0);
        match ScanCursor::open(engine, CompareOp::Eq, None) {
            Err(IndexError::InvalidOperation(_)) => {}
            other => panic!("expected InvalidOperation, got {}", other.is_ok()),
        }
    }

    #[test]
    fn no_op_scan_yields_everything_ascending() {
        let engine = engine_with(2, &[5, 3, 1, 4, 2]);
        let mut cursor = ScanCursor::open(engine, CompareOp::NoOp, None).unwrap();
        let mut got = Vec::new();
        loop {
            match cursor.next_entry() {
                Ok(e) => got.push(match e.key {
                    IndexKey::Int(v) => v,
                    _ => unreachable!(),
                }),
                Err(IndexError::ScanExhausted) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
    }
}
