//! Builds an index through the manager facade, then runs a bounded
//! ascending scan over it.

use bptree_index::{CompareOp, IndexKey, InMemoryCatalog, IndexManager, KeyKind, Rid};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;
    let mut catalog = InMemoryCatalog::new();
    catalog.register("orders", "amount", KeyKind::Int);
    let manager = IndexManager::new(dir.path(), catalog);

    manager.create_index("orders", "amount")?;
    let mut index = manager.open_index("orders", "amount")?;
    for amount in [10, 50, 30, 70, 20, 60] {
        index.insert_entry(IndexKey::Int(amount), Rid::new(1, amount as u32))?;
    }

    let mut scan = index.open_scan(CompareOp::Gt, Some(IndexKey::Int(20)))?;
    while let Ok(entry) = scan.next_entry() {
        println!("{:?}", entry);
    }
    drop(scan);

    manager.close_index(index)?;
    Ok(())
}
