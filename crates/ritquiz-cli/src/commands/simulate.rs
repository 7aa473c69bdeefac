//! The `ritquiz simulate` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use ritquiz_core::bank::load_item_bank;
use ritquiz_core::model::Rit;
use ritquiz_core::runner::{RunnerConfig, SessionRunner};
use ritquiz_core::session::StartRequest;
use ritquiz_core::simulate::{simulate_cohort, CohortConfig, CohortReport};
use ritquiz_core::statistics::CohortStats;
use ritquiz_sinks::config::load_config_from;
use ritquiz_sinks::MemorySink;

use crate::commands::parse_strands;

pub struct SimulateArgs {
    pub true_ability: Rit,
    pub sessions: usize,
    pub grade: Option<String>,
    pub strands: Option<String>,
    pub max_items: Option<u32>,
    pub parallelism: usize,
    pub seed: Option<u64>,
    pub bank: Option<PathBuf>,
    pub allow_partial_bank: bool,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: SimulateArgs) -> Result<()> {
    anyhow::ensure!(args.sessions >= 1, "sessions must be at least 1");
    anyhow::ensure!(
        matches!(args.format.as_str(), "table" | "json"),
        "unknown format '{}' (expected table or json)",
        args.format
    );

    let mut config = load_config_from(args.config.as_deref())?;
    if let Some(max) = args.max_items {
        config.max_items_per_session = max;
    }
    let session_config = config.session_config()?;

    let bank_path = args.bank.unwrap_or_else(|| config.item_bank.clone());
    let bank = load_item_bank(&bank_path, args.allow_partial_bank)?;
    tracing::debug!(bank = %bank_path.display(), items = bank.len(), "loaded item bank");

    let grade = match args.grade {
        Some(grade) => grade,
        None => session_config
            .starting_ability_by_grade
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no grades configured"))?,
    };
    let strands = match args.strands.as_deref() {
        Some(list) => parse_strands(list),
        None => session_config.available_strands.clone(),
    };

    // Simulated records are kept in memory only.
    let runner = SessionRunner::new(
        Arc::new(bank),
        Arc::new(MemorySink::new()),
        session_config,
        RunnerConfig::default(),
    );

    let cohort = CohortConfig {
        sessions: args.sessions,
        true_ability: args.true_ability,
        parallelism: args.parallelism,
        seed: args.seed,
        template: StartRequest {
            username: "sim".into(),
            grade: Some(grade),
            strands,
        },
    };

    eprintln!(
        "ritquiz v{}: simulating {} sessions at true RIT {}",
        env!("CARGO_PKG_VERSION"),
        cohort.sessions,
        cohort.true_ability
    );

    let report = simulate_cohort(&runner, &cohort).await?;
    let Some(stats) = &report.stats else {
        anyhow::bail!("all {} simulated sessions failed", report.failed);
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        print_summary(&report, stats);
    }

    Ok(())
}

fn print_summary(report: &CohortReport, stats: &CohortStats) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Sessions",
        "True RIT",
        "Mean final",
        "Std dev",
        "Range",
        "Mean abs error",
        "Accuracy",
        "In band",
    ]);
    table.add_row(vec![
        Cell::new(stats.sessions),
        Cell::new(stats.true_ability),
        Cell::new(format!("{:.1}", stats.mean_final)),
        Cell::new(format!("{:.1}", stats.std_dev_final)),
        Cell::new(format!("{}-{}", stats.min_final, stats.max_final)),
        Cell::new(format!("{:.1}", stats.mean_abs_error)),
        Cell::new(format!("{:.1}%", stats.mean_accuracy * 100.0)),
        Cell::new(format!("{:.1}%", stats.in_band_rate * 100.0)),
    ]);
    println!("{table}");

    let curve: Vec<String> = stats
        .mean_trajectory
        .iter()
        .map(|v| format!("{v:.0}"))
        .collect();
    println!("Mean trajectory: {}", curve.join(" -> "));
    println!(
        "Items: {} easy, {} at level, {} hard",
        stats.classes.easy, stats.classes.at_level, stats.classes.hard
    );

    if report.failed > 0 {
        eprintln!("{} session(s) failed", report.failed);
    }
    eprintln!("Completed in {:.1}s", report.duration_ms as f64 / 1000.0);
}
