//! The `ritquiz validate` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use ritquiz_core::bank::parse_item_bank;
use ritquiz_core::model::Rit;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let loaded = parse_item_bank(&bank_path)?;

    println!("Item bank: {} ({} items)", loaded.name, loaded.items.len());

    let mut strands: BTreeMap<&str, (usize, Rit, Rit)> = BTreeMap::new();
    for item in &loaded.items {
        let entry = strands
            .entry(item.strand.as_str())
            .or_insert((0, item.band.low(), item.band.high()));
        entry.0 += 1;
        entry.1 = entry.1.min(item.band.low());
        entry.2 = entry.2.max(item.band.high());
    }
    for (strand, (count, low, high)) in &strands {
        println!("  {strand}: {count} items, RIT {low}-{high}");
    }

    for err in &loaded.rejected {
        let prefix = err
            .item_id()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} REJECTED: {err}");
    }

    if loaded.rejected.is_empty() && !loaded.items.is_empty() {
        println!("Item bank valid.");
        Ok(())
    } else if loaded.items.is_empty() {
        anyhow::bail!("item bank has no usable items")
    } else {
        anyhow::bail!("{} row(s) rejected", loaded.rejected.len())
    }
}
