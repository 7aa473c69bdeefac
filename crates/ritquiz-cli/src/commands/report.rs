//! The `ritquiz report` command.

use std::path::PathBuf;

use anyhow::Result;

use ritquiz_report::write_html_report;
use ritquiz_sinks::config::load_config_from;
use ritquiz_sinks::{find_record, load_records};

use crate::commands::results_path;

pub fn execute(
    session: String,
    results: Option<PathBuf>,
    output: PathBuf,
    format: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config.as_deref())?;
    let path = results_path(results, &config)?;
    let records = load_records(&path)?;
    let record = find_record(&records, &session)?;

    match format.as_str() {
        "html" => {
            write_html_report(record, &output)?;
            println!("HTML report: {}", output.display());
        }
        "markdown" => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output, record.to_markdown())?;
            println!("Markdown report: {}", output.display());
        }
        "json" => {
            record.save_json(&output)?;
            println!("JSON record: {}", output.display());
        }
        other => anyhow::bail!("unknown format '{other}' (expected html, markdown or json)"),
    }

    Ok(())
}
