//! Byte layout for the metadata page and node pages.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{IndexError, IndexResult};
use crate::storage::key::{Entry, IndexKey, KeyKind, Rid};
use crate::storage::node::{Node, NO_PAGE};

const KEY_WIDTH: usize = 4;
const RID_WIDTH: usize = 8;
const CHILD_WIDTH: usize = 4;
const NODE_HEADER_LEN: usize = 13;

/// Derives the B+-tree order `d` for a page of `page_size` bytes, i.e. the
/// largest `d` such that a node holding `2d` entries (the worst case for
/// both leaf and internal layouts) still fits in one page.
pub fn order_for_page_size(page_size: usize) -> usize {
    let leaf_entry_width = KEY_WIDTH + RID_WIDTH;
    let usable = page_size.saturating_sub(NODE_HEADER_LEN);
    // internal nodes need room for 2d+1 children as well as 2d keys; use
    // the wider of the two per-entry costs so both kinds fit.
    let internal_entry_width = KEY_WIDTH + CHILD_WIDTH;
    let entry_width = leaf_entry_width.max(internal_entry_width);
    let max_entries = usable / entry_width;
    (max_entries / 2).max(1)
}

/// Metadata page (page 0): key type tag, root page number, height, free hint.
pub struct Metadata {
    pub key_kind: KeyKind,
    pub root_page: u32,
    pub height: u32,
    pub free_page_hint: u32,
}

impl Metadata {
    pub fn encode(&self, page_size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; page_size];
        buf[0] = self.key_kind.tag();
        LittleEndian::write_u32(&mut buf[1..5], self.root_page);
        LittleEndian::write_u32(&mut buf[5..9], self.height);
        LittleEndian::write_u32(&mut buf[9..13], self.free_page_hint);
        buf
    }

    pub fn decode(data: &[u8]) -> IndexResult<Self> {
        if data.len() < 13 {
            return Err(IndexError::Corrupt("metadata page too short".into()));
        }
        let key_kind = KeyKind::from_tag(data[0])
            .ok_or_else(|| IndexError::Corrupt(format!("unknown key type tag {}", data[0])))?;
        Ok(Metadata {
            key_kind,
            root_page: LittleEndian::read_u32(&data[1..5]),
            height: LittleEndian::read_u32(&data[5..9]),
            free_page_hint: LittleEndian::read_u32(&data[9..13]),
        })
    }
}

/// Encodes a node to a fixed-size page buffer.
pub fn encode_node(node: &Node, page_size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; page_size];
    match node {
        Node::Leaf(leaf) => {
            buf[0] = 1;
            LittleEndian::write_u32(&mut buf[1..5], leaf.entries.len() as u32);
            LittleEndian::write_i32(&mut buf[5..9], leaf.left as i32);
            LittleEndian::write_i32(&mut buf[9..13], leaf.right as i32);
            let mut off = NODE_HEADER_LEN;
            for entry in &leaf.entries {
                buf[off..off + KEY_WIDTH].copy_from_slice(&entry.key.to_bytes());
                off += KEY_WIDTH;
            }
            for entry in &leaf.entries {
                buf[off..off + RID_WIDTH].copy_from_slice(&entry.rid.to_bytes());
                off += RID_WIDTH;
            }
        }
        Node::Internal(internal) => {
            buf[0] = 0;
            LittleEndian::write_u32(&mut buf[1..5], internal.keys.len() as u32);
            LittleEndian::write_i32(&mut buf[5..9], NO_PAGE as i32);
            LittleEndian::write_i32(&mut buf[9..13], NO_PAGE as i32);
            let mut off = NODE_HEADER_LEN;
            for key in &internal.keys {
                buf[off..off + KEY_WIDTH].copy_from_slice(&key.to_bytes());
                off += KEY_WIDTH;
            }
            for child in &internal.children {
                LittleEndian::write_u32(&mut buf[off..off + CHILD_WIDTH], *child as u32);
                off += CHILD_WIDTH;
            }
        }
    }
    buf
}

/// Decodes a node from a page buffer. `page_num` is the page it was read
/// from (not stored in the bytes themselves).
pub fn decode_node(data: &[u8], page_num: u32, key_kind: KeyKind, order: usize) -> IndexResult<Node> {
    if data.len() < NODE_HEADER_LEN {
        return Err(IndexError::Corrupt("node page too short".into()));
    }
    let kind = data[0];
    let n = LittleEndian::read_u32(&data[1..5]) as usize;
    if n > 2 * order {
        return Err(IndexError::Corrupt(format!(
            "node page {} has {} keys, exceeds 2d={}",
            page_num,
            n,
            2 * order
        )));
    }
    let mut off = NODE_HEADER_LEN;
    match kind {
        1 => {
            let left = LittleEndian::read_i32(&data[5..9]);
            let right = LittleEndian::read_i32(&data[9..13]);
            let mut keys = Vec::with_capacity(n);
            for _ in 0..n {
                let bytes: [u8; 4] = data[off..off + KEY_WIDTH].try_into().unwrap();
                keys.push(IndexKey::from_bytes(key_kind, bytes));
                off += KEY_WIDTH;
            }
            let mut entries = Vec::with_capacity(n);
            for key in keys {
                let bytes: [u8; 8] = data[off..off + RID_WIDTH].try_into().unwrap();
                entries.push(Entry::new(key, Rid::from_bytes(bytes)));
                off += RID_WIDTH;
            }
            Ok(Node::new_leaf_loaded(page_num, entries, left, right))
        }
        0 => {
            let mut keys = Vec::with_capacity(n);
            for _ in 0..n {
                let bytes: [u8; 4] = data[off..off + KEY_WIDTH].try_into().unwrap();
                keys.push(IndexKey::from_bytes(key_kind, bytes));
                off += KEY_WIDTH;
            }
            let mut children = Vec::with_capacity(n + 1);
            for _ in 0..(n + 1) {
                children.push(LittleEndian::read_u32(&data[off..off + CHILD_WIDTH]));
                off += CHILD_WIDTH;
            }
            Ok(Node::new_internal_loaded(page_num, keys, children))
        }
        other => Err(IndexError::Corrupt(format!("unknown node kind byte {}", other))),
    }
}
