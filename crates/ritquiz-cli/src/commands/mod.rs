pub mod history;
pub mod init;
pub mod report;
pub mod simulate;
pub mod take;
pub mod validate;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use ritquiz_sinks::RitquizConfig;

/// Split a comma-separated strand list, dropping empty entries.
pub fn parse_strands(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// The results file: `--results` if given, else the configured JSON-lines sink.
pub fn results_path(explicit: Option<PathBuf>, config: &RitquizConfig) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config.results_path().map(Path::to_path_buf).ok_or_else(|| {
            anyhow::anyhow!("the configured sink does not write a file; pass --results")
        }),
    }
}
