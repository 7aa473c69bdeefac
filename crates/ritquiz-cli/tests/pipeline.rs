//! End-to-end pipeline tests across the library crates.
//!
//! Loads the shipped item bank, runs sessions into a JSON-lines sink, reads
//! the records back and renders reports from them.

use std::path::Path;
use std::sync::Arc;

use ritquiz_core::bank::load_item_bank;
use ritquiz_core::error::SessionError;
use ritquiz_core::runner::{RunnerConfig, SessionRunner};
use ritquiz_core::session::{SessionConfig, StartRequest};
use ritquiz_core::simulate::{simulate_cohort, CohortConfig, SimulatedTaker};
use ritquiz_report::generate_html;
use ritquiz_sinks::{find_record, load_records, JsonLinesSink, MemorySink};

fn shipped_bank() -> Arc<ritquiz_core::model::ItemBank> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../item-banks/math-growth.toml");
    Arc::new(load_item_bank(&path, false).unwrap())
}

fn request() -> StartRequest {
    StartRequest::new("pipeline", "Grade 9", ["Algebra", "Measurement"])
}

#[test]
fn shipped_bank_covers_every_default_strand() {
    let bank = shipped_bank();
    let counts = bank.strand_counts();
    for strand in SessionConfig::default().available_strands {
        assert_eq!(counts.get(strand.as_str()), Some(&7), "strand {strand}");
    }
}

#[tokio::test]
async fn cohort_records_round_trip_through_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.jsonl");
    let runner = SessionRunner::new(
        shipped_bank(),
        Arc::new(JsonLinesSink::new(&path)),
        SessionConfig::default(),
        RunnerConfig::default(),
    );

    let report = simulate_cohort(
        &runner,
        &CohortConfig {
            sessions: 6,
            true_ability: 215,
            parallelism: 3,
            seed: Some(11),
            template: request(),
        },
    )
    .await
    .unwrap();
    assert_eq!(report.failed, 0);

    let stored = load_records(&path).unwrap();
    assert_eq!(stored.len(), 6);
    for record in &report.records {
        let found = find_record(&stored, &record.id.to_string()).unwrap();
        assert_eq!(found, record);
        assert_eq!(found.rit_history.len(), 15);
        assert!(found
            .points
            .iter()
            .all(|p| p.strand == "Algebra" || p.strand == "Measurement"));
    }

    let html = generate_html(&stored[0]);
    assert!(html.contains(&stored[0].username));
    assert!(html.contains("<polyline"));
}

#[tokio::test]
async fn persistence_failure_reaches_the_caller() {
    let sink = Arc::new(MemorySink::rejecting(1));
    let runner = SessionRunner::new(
        shipped_bank(),
        Arc::clone(&sink) as Arc<dyn ritquiz_core::traits::ResultSink>,
        SessionConfig {
            max_items: 2,
            ..SessionConfig::default()
        },
        RunnerConfig {
            seed: Some(4),
            ..RunnerConfig::default()
        },
    );

    let mut taker = SimulatedTaker::new(200, 4);
    let err = runner.run(request(), &mut taker).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::PersistenceFailure(_))
    ));
    assert_eq!(sink.append_count(), 1);
    assert!(sink.records().is_empty());
}
