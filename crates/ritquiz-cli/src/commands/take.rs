//! The `ritquiz take` command.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncBufRead;

use ritquiz_core::bank::load_item_bank;
use ritquiz_core::error::SessionError;
use ritquiz_core::record::SessionRecord;
use ritquiz_core::runner::SessionRunner;
use ritquiz_core::session::{Session, StartRequest};
use ritquiz_core::traits::QuizUi;
use ritquiz_report::write_html_report;
use ritquiz_sinks::config::load_config_from;
use ritquiz_sinks::create_sink;

use crate::commands::parse_strands;
use crate::terminal::{self, TerminalUi};

pub struct TakeArgs {
    pub bank: Option<PathBuf>,
    pub name: Option<String>,
    pub grade: Option<String>,
    pub strands: Option<String>,
    pub max_items: Option<u32>,
    pub seed: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub allow_partial_bank: bool,
    pub report: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: TakeArgs) -> Result<()> {
    let mut config = load_config_from(args.config.as_deref())?;
    if let Some(max) = args.max_items {
        config.max_items_per_session = max;
    }
    if let Some(secs) = args.timeout_secs {
        anyhow::ensure!(secs >= 1, "timeout must be at least 1 second");
        config.answer_timeout_secs = Some(secs);
    }

    let bank_path = args.bank.unwrap_or_else(|| config.item_bank.clone());
    let bank = load_item_bank(&bank_path, args.allow_partial_bank)?;
    tracing::debug!(bank = %bank.id, strands = ?bank.strand_counts(), "loaded item bank");
    eprintln!(
        "Item bank: {} ({} items) from {}",
        bank.name,
        bank.len(),
        bank_path.display()
    );

    let sink = create_sink(&config.sink);
    let runner = SessionRunner::new(
        Arc::new(bank),
        sink,
        config.session_config()?,
        config.runner_config(args.seed),
    );

    let mut ui = terminal::stdio();
    let mut session = runner.new_session();

    let request = StartRequest {
        username: args.name.unwrap_or_default(),
        grade: args.grade,
        strands: args.strands.as_deref().map(parse_strands).unwrap_or_default(),
    };
    let request = gather_start(&mut ui, &session, request).await?;
    session.start(request)?;

    if let Some(limit) = config.answer_timeout_secs.map(Duration::from_secs) {
        ui.say(&format!("You have {}s per question.", limit.as_secs()))?;
    }

    let record = match runner.drive(&mut session, &mut ui).await {
        Ok(record) => record,
        Err(e) => match e.downcast::<SessionError>() {
            Ok(SessionError::PersistenceFailure(reason)) => {
                retry_persist(&runner, &mut session, &mut ui, reason).await?
            }
            Ok(other) => return Err(other.into()),
            Err(e) => return Err(e),
        },
    };

    match config.results_path() {
        Some(path) => eprintln!("Session {} saved to {}", record.id, path.display()),
        None => eprintln!("Session {} recorded", record.id),
    }

    if let Some(path) = args.report {
        write_html_report(&record, &path)?;
        eprintln!("HTML report: {}", path.display());
    }

    Ok(())
}

/// Offer to save a finished session again until the sink accepts it or
/// input closes.
async fn retry_persist<R, W>(
    runner: &SessionRunner,
    session: &mut Session,
    ui: &mut TerminalUi<R, W>,
    mut reason: String,
) -> Result<SessionRecord>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    loop {
        ui.say(&format!("Could not save the session: {reason}"))?;
        if ui.prompt("Press Enter to retry saving. ").await?.is_none() {
            anyhow::bail!("session finished but was not saved: {reason}");
        }
        match runner.persist(session).await {
            Ok(record) => {
                ui.present_final(record.final_rit, &record.rit_history)
                    .await?;
                return Ok(record);
            }
            Err(SessionError::PersistenceFailure(again)) => reason = again,
            Err(other) => return Err(other.into()),
        }
    }
}

const PROMPT_ORDER: [&str; 3] = ["username", "grade", "strands"];

/// Prompt again for every start field that fails validation.
async fn gather_start<R, W>(
    ui: &mut TerminalUi<R, W>,
    session: &Session,
    mut request: StartRequest,
) -> Result<StartRequest>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    let config = session.config();
    loop {
        let warnings = session.validate(&request);
        if warnings.is_empty() {
            return Ok(request);
        }

        let mut fields = BTreeSet::new();
        for w in &warnings {
            ui.say(&format!("  {w}"))?;
            fields.insert(w.field);
        }
        if let Some(other) = fields.iter().find(|f| !PROMPT_ORDER.contains(*f)) {
            anyhow::bail!("cannot prompt for '{other}'");
        }

        for field in PROMPT_ORDER.into_iter().filter(|f| fields.contains(f)) {
            match field {
                "username" => {
                    request.username = read(ui, "Name: ").await?;
                }
                "grade" => {
                    let grades: Vec<&str> = config
                        .starting_ability_by_grade
                        .keys()
                        .map(String::as_str)
                        .collect();
                    let label = format!("Grade ({}): ", grades.join(", "));
                    request.grade = Some(read(ui, &label).await?);
                }
                "strands" => {
                    let strands: Vec<&str> =
                        config.available_strands.iter().map(String::as_str).collect();
                    let line = read(
                        ui,
                        &format!("Strands, comma-separated ({}): ", strands.join(", ")),
                    )
                    .await?;
                    request.strands = parse_strands(&line);
                }
                _ => {}
            }
        }
    }
}

async fn read<R, W>(ui: &mut TerminalUi<R, W>, label: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    let line = ui
        .prompt(label)
        .await?
        .context("input closed before the session started")?;
    Ok(line.trim().to_string())
}
