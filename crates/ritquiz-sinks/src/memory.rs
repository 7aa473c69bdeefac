//! In-memory result sink.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use ritquiz_core::record::SessionRecord;
use ritquiz_core::traits::ResultSink;

use crate::error::SinkError;

/// Keeps records in memory. Used for simulations, dry runs and tests.
///
/// Can be told to reject a number of appends to exercise failure handling.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<SessionRecord>>,
    append_count: AtomicU32,
    rejections_left: AtomicU32,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects its first `n` appends.
    pub fn rejecting(n: u32) -> Self {
        Self {
            rejections_left: AtomicU32::new(n),
            ..Self::default()
        }
    }

    /// Stored records, in append order.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.lock().clone()
    }

    /// Number of append attempts, including rejected ones.
    pub fn append_count(&self) -> u32 {
        self.append_count.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SessionRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, record: &SessionRecord) -> anyhow::Result<()> {
        self.append_count.fetch_add(1, Ordering::Relaxed);

        let rejected = self
            .rejections_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(SinkError::Rejected(format!("memory sink refused {}", record.id)).into());
        }

        self.lock().push(record.clone());
        Ok(())
    }
}
