//! Shared fixtures for unit tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::model::{Item, ItemBank, Rit, RitBand};
use crate::record::SessionRecord;
use crate::traits::ResultSink;

/// An item with choices A/B/C keyed to "B".
pub(crate) fn item(id: &str, strand: &str, low: Rit, high: Rit) -> Item {
    Item {
        id: id.into(),
        question: format!("Question {id}"),
        strand: strand.into(),
        band: RitBand::new(low, high).unwrap(),
        choices: vec!["A".into(), "B".into(), "C".into()],
        correct: "B".into(),
    }
}

pub(crate) fn strands(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A bank covering 150..260 in Algebra and Numbers, 10 points per band.
pub(crate) fn ladder_bank() -> Arc<ItemBank> {
    let mut items = Vec::new();
    for (i, low) in (150..260).step_by(10).enumerate() {
        items.push(item(&format!("ALG-{i}"), "Algebra", low, low + 10));
        items.push(item(&format!("NUM-{i}"), "Numbers", low, low + 10));
    }
    Arc::new(ItemBank::new("ladder", "Ladder", items).unwrap())
}

/// Sink that keeps records in memory and can be told to fail.
#[derive(Default)]
pub(crate) struct CollectingSink {
    records: Mutex<Vec<SessionRecord>>,
    failures_left: AtomicU32,
}

impl CollectingSink {
    /// Fail the first `n` appends.
    pub(crate) fn failing(n: u32) -> Self {
        Self {
            records: Default::default(),
            failures_left: AtomicU32::new(n),
        }
    }

    pub(crate) fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for CollectingSink {
    fn name(&self) -> &str {
        "collecting"
    }

    async fn append(&self, record: &SessionRecord) -> anyhow::Result<()> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("sink unavailable");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
