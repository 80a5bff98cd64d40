//! Creates an index, inserts a handful of entries, looks one up, deletes
//! it, and closes the index.

use bptree_index::{IndexKey, KeyKind, Rid};
use bptree_index::handle::IndexHandle;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("customers.idx");

    let mut index = IndexHandle::open(&path, KeyKind::Int)?;
    for id in [101, 104, 102, 103] {
        index.insert_entry(IndexKey::Int(id), Rid::new(1, id as u32))?;
    }

    println!("contains 102: {}", index.search(&IndexKey::Int(102))?);

    index.delete_entry(IndexKey::Int(102), Rid::new(1, 102))?;
    println!("contains 102 after delete: {}", index.search(&IndexKey::Int(102))?);

    index.close()?;
    Ok(())
}
