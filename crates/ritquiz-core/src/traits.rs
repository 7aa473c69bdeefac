//! Port traits for the presentation layer and result persistence.
//!
//! The core never renders anything or writes anywhere itself: a [`QuizUi`]
//! adapter shows items and collects answers, and a [`ResultSink`] stores
//! finished session records. Implementations live in `ritquiz-sinks` and
//! `ritquiz-cli`.

use async_trait::async_trait;

use crate::model::{Item, Rit};
use crate::record::SessionRecord;
use crate::session::Feedback;

// ---------------------------------------------------------------------------
// Result sink
// ---------------------------------------------------------------------------

/// Append-only store for finished session records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Human-readable sink name (e.g. "jsonl").
    fn name(&self) -> &str;

    /// Persist one record. An error means the record was not stored.
    async fn append(&self, record: &SessionRecord) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Quiz UI
// ---------------------------------------------------------------------------

/// Presentation and input adapter for one session.
#[async_trait]
pub trait QuizUi: Send {
    /// Show how far through the session the test-taker is.
    async fn present_progress(&mut self, administered: u32, max_items: u32) -> anyhow::Result<()>;

    /// Show an item and wait for the chosen answer text.
    ///
    /// `number` is 1-based. `Ok(None)` means the input was closed and the
    /// session should be abandoned.
    async fn present_item(
        &mut self,
        item: &Item,
        number: u32,
        max_items: u32,
    ) -> anyhow::Result<Option<String>>;

    /// Show whether the last response was correct.
    async fn present_feedback(&mut self, feedback: &Feedback) -> anyhow::Result<()>;

    /// Wait until the test-taker asks for the next item.
    async fn await_advance(&mut self) -> anyhow::Result<()>;

    /// Show the final estimate and the ability trajectory.
    async fn present_final(&mut self, final_ability: Rit, trajectory: &[Rit]) -> anyhow::Result<()>;
}
