//! Synthetic test-takers and cohort simulation.
//!
//! A [`SimulatedTaker`] answers items according to a fixed true ability, so
//! a cohort of them shows how quickly and how tightly the adaptive estimate
//! converges. Sessions in a cohort share one item bank and run concurrently
//! with bounded parallelism.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Semaphore;

use crate::model::{Item, Rit};
use crate::record::SessionRecord;
use crate::runner::SessionRunner;
use crate::session::{Feedback, Session, StartRequest};
use crate::statistics::{compute_cohort_stats, CohortStats};
use crate::traits::QuizUi;

/// Spread of the logistic response curve, in RIT points.
const RESPONSE_SCALE: f64 = 10.0;

/// A test-taker with a known ability who never hesitates.
pub struct SimulatedTaker {
    true_ability: Rit,
    rng: StdRng,
}

impl SimulatedTaker {
    pub fn new(true_ability: Rit, seed: u64) -> Self {
        Self {
            true_ability,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Chance of answering `item` correctly: 0.5 at the middle of its band,
    /// rising for items below the true ability and falling above it.
    pub fn p_correct(&self, item: &Item) -> f64 {
        let mid = (item.band.low() as f64 + item.band.high() as f64) / 2.0;
        1.0 / (1.0 + (-(self.true_ability as f64 - mid) / RESPONSE_SCALE).exp())
    }
}

#[async_trait]
impl QuizUi for SimulatedTaker {
    async fn present_progress(&mut self, _administered: u32, _max_items: u32) -> Result<()> {
        Ok(())
    }

    async fn present_item(
        &mut self,
        item: &Item,
        _number: u32,
        _max_items: u32,
    ) -> Result<Option<String>> {
        let correct = self.rng.random_bool(self.p_correct(item).clamp(0.0, 1.0));
        let answer = if correct {
            item.correct.clone()
        } else {
            item.choices
                .iter()
                .find(|c| **c != item.correct)
                .cloned()
                .unwrap_or_default()
        };
        Ok(Some(answer))
    }

    async fn present_feedback(&mut self, _feedback: &Feedback) -> Result<()> {
        Ok(())
    }

    async fn await_advance(&mut self) -> Result<()> {
        Ok(())
    }

    async fn present_final(&mut self, _final_ability: Rit, _trajectory: &[Rit]) -> Result<()> {
        Ok(())
    }
}

/// Parameters of a simulated cohort.
#[derive(Debug, Clone)]
pub struct CohortConfig {
    /// Number of sessions to run.
    pub sessions: usize,
    /// Ability every simulated taker answers at.
    pub true_ability: Rit,
    /// Maximum sessions in flight at once.
    pub parallelism: usize,
    /// Base seed; session `i` uses `seed + i`.
    pub seed: Option<u64>,
    /// Grade and strands for every session. The username gets a suffix.
    pub template: StartRequest,
}

/// Outcome of a cohort run.
#[derive(Debug, Clone)]
pub struct CohortReport {
    pub records: Vec<SessionRecord>,
    pub failed: usize,
    pub stats: Option<CohortStats>,
    pub duration_ms: u64,
}

/// Run a cohort of simulated sessions through `runner`.
pub async fn simulate_cohort(runner: &SessionRunner, config: &CohortConfig) -> Result<CohortReport> {
    anyhow::ensure!(config.parallelism >= 1, "parallelism must be at least 1");

    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(config.parallelism));
    let base_seed = config
        .seed
        .unwrap_or_else(|| rand::rng().random::<u64>());

    let mut futures = FuturesUnordered::new();
    for i in 0..config.sessions {
        let semaphore = Arc::clone(&semaphore);
        let seed = base_seed.wrapping_add(i as u64);
        let mut request = config.template.clone();
        request.username = format!("{}-{}", config.template.username, i + 1);

        futures.push(async move {
            let inner = async {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;

                let mut session = Session::seeded(
                    Arc::clone(runner.bank()),
                    runner.session_config().clone(),
                    seed,
                );
                session.start(request)?;
                let mut taker = SimulatedTaker::new(config.true_ability, seed);
                runner.drive(&mut session, &mut taker).await
            };
            (i, inner.await)
        });
    }

    let mut records = Vec::with_capacity(config.sessions);
    let mut failed = 0usize;
    while let Some((i, result)) = futures.next().await {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::error!("simulated session {} failed: {e:#}", i + 1);
                failed += 1;
            }
        }
    }

    let stats = compute_cohort_stats(&records, config.true_ability);
    tracing::info!(
        sessions = config.sessions,
        failed,
        true_ability = config.true_ability,
        "cohort complete"
    );

    Ok(CohortReport {
        records,
        failed,
        stats,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunnerConfig;
    use crate::session::SessionConfig;
    use crate::testing::{item, ladder_bank, CollectingSink};

    fn cohort(true_ability: Rit, sessions: usize) -> CohortConfig {
        CohortConfig {
            sessions,
            true_ability,
            parallelism: 4,
            seed: Some(99),
            template: StartRequest::new("sim", "Grade 6", ["Algebra", "Numbers"]),
        }
    }

    fn runner(sink: Arc<CollectingSink>, max_items: u32) -> SessionRunner {
        SessionRunner::new(
            ladder_bank(),
            sink,
            SessionConfig {
                max_items,
                ..SessionConfig::default()
            },
            RunnerConfig::default(),
        )
    }

    #[test]
    fn response_curve() {
        let taker = SimulatedTaker::new(200, 0);
        let at = item("Q", "Algebra", 195, 205);
        let far_below = item("Q", "Algebra", 100, 110);
        let far_above = item("Q", "Algebra", 300, 310);
        assert!((taker.p_correct(&at) - 0.5).abs() < 1e-9);
        assert!(taker.p_correct(&far_below) > 0.99);
        assert!(taker.p_correct(&far_above) < 0.01);
    }

    #[tokio::test]
    async fn cohort_runs_every_session() {
        let sink = Arc::new(CollectingSink::default());
        let runner = runner(Arc::clone(&sink), 15);
        let report = simulate_cohort(&runner, &cohort(230, 12)).await.unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(report.records.len(), 12);
        assert_eq!(sink.records().len(), 12);
        let stats = report.stats.unwrap();
        assert_eq!(stats.sessions, 12);
        assert_eq!(stats.mean_trajectory.len(), 15);
        assert_eq!(stats.classes.total(), 12 * 15);

        let mut names: Vec<String> = report.records.iter().map(|r| r.username.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 12);
    }

    #[tokio::test]
    async fn estimates_move_toward_true_ability() {
        let sink = Arc::new(CollectingSink::default());
        let runner = runner(sink, 15);
        let high = simulate_cohort(&runner, &cohort(240, 20)).await.unwrap();
        let low = simulate_cohort(&runner, &cohort(160, 20)).await.unwrap();

        let high_mean = high.stats.unwrap().mean_final;
        let low_mean = low.stats.unwrap().mean_final;
        assert!(high_mean > 200.0, "high cohort mean {high_mean}");
        assert!(low_mean < 200.0, "low cohort mean {low_mean}");
    }

    #[tokio::test]
    async fn zero_parallelism_is_rejected() {
        let sink = Arc::new(CollectingSink::default());
        let runner = runner(sink, 3);
        let mut config = cohort(200, 1);
        config.parallelism = 0;
        assert!(simulate_cohort(&runner, &config).await.is_err());
    }
}
