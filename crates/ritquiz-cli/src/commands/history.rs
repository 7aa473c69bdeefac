//! The `ritquiz history` command.

use std::path::PathBuf;

use anyhow::Result;

use ritquiz_core::record::SessionRecord;
use ritquiz_sinks::config::load_config_from;
use ritquiz_sinks::load_records;

use crate::commands::results_path;

pub fn execute(results: Option<PathBuf>, format: String, config: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config.as_deref())?;
    let path = results_path(results, &config)?;
    let records = load_records(&path)?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        "table" => {
            if records.is_empty() {
                println!("No sessions recorded in {}", path.display());
            } else {
                print_table(&records);
            }
        }
        other => anyhow::bail!("unknown format '{other}' (expected table or json)"),
    }

    Ok(())
}

fn print_table(records: &[SessionRecord]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Session", "Student", "Grade", "Strands", "Start", "Final", "Growth", "Score", "Date",
    ]);

    for r in records {
        let id = r.id.to_string();
        table.add_row(vec![
            Cell::new(&id[..8]),
            Cell::new(&r.username),
            Cell::new(&r.grade_level),
            Cell::new(r.strands_selected.join(", ")),
            Cell::new(r.starting_rit),
            Cell::new(r.final_rit),
            Cell::new(format!("{:+}", r.growth())),
            Cell::new(format!("{}/{}", r.score_correct, r.score_total)),
            Cell::new(r.timestamp.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!("{table}");
}
