//! Configuration loading and sink factory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ritquiz_core::model::Rit;
use ritquiz_core::runner::{RunnerConfig, TimeoutPolicy};
use ritquiz_core::session::{default_grades, default_strands, SessionConfig};
use ritquiz_core::traits::ResultSink;

use crate::jsonl::JsonLinesSink;
use crate::memory::MemorySink;

/// Where finished session records go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Jsonl {
        #[serde(default = "default_results_path")]
        path: PathBuf,
    },
    Memory,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Jsonl {
            path: default_results_path(),
        }
    }
}

fn default_results_path() -> PathBuf {
    PathBuf::from("ritquiz-results/sessions.jsonl")
}

/// Top-level ritquiz configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RitquizConfig {
    /// Starting ability per grade label.
    #[serde(default = "default_grades")]
    pub starting_ability_by_grade: BTreeMap<String, Rit>,
    /// Items per session.
    #[serde(default = "default_max_items")]
    pub max_items_per_session: u32,
    /// Strands a test-taker may select.
    #[serde(default = "default_strand_list")]
    pub available_strands: Vec<String>,
    /// Item bank file.
    #[serde(default = "default_item_bank")]
    pub item_bank: PathBuf,
    /// Longest wait for an answer, in seconds. Unset waits indefinitely.
    #[serde(default)]
    pub answer_timeout_secs: Option<u64>,
    /// What an expired answer timeout does.
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
    #[serde(default)]
    pub sink: SinkConfig,
}

fn default_max_items() -> u32 {
    15
}
fn default_strand_list() -> Vec<String> {
    default_strands().into_iter().collect()
}
fn default_item_bank() -> PathBuf {
    PathBuf::from("item-banks/math-growth.toml")
}

impl Default for RitquizConfig {
    fn default() -> Self {
        Self {
            starting_ability_by_grade: default_grades(),
            max_items_per_session: default_max_items(),
            available_strands: default_strand_list(),
            item_bank: default_item_bank(),
            answer_timeout_secs: None,
            timeout_policy: TimeoutPolicy::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl RitquizConfig {
    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> Result<SessionConfig> {
        anyhow::ensure!(
            self.max_items_per_session >= 1,
            "max_items_per_session must be at least 1"
        );
        anyhow::ensure!(
            !self.starting_ability_by_grade.is_empty(),
            "starting_ability_by_grade must list at least one grade"
        );
        anyhow::ensure!(
            !self.available_strands.is_empty(),
            "available_strands must list at least one strand"
        );
        Ok(SessionConfig {
            starting_ability_by_grade: self.starting_ability_by_grade.clone(),
            max_items: self.max_items_per_session,
            available_strands: self.available_strands.iter().cloned().collect(),
        })
    }

    /// Runner settings derived from this configuration.
    pub fn runner_config(&self, seed: Option<u64>) -> RunnerConfig {
        RunnerConfig {
            answer_timeout: self.answer_timeout_secs.map(Duration::from_secs),
            timeout_policy: self.timeout_policy,
            seed,
        }
    }

    /// Path of the JSON-lines results file, if records go to one.
    pub fn results_path(&self) -> Option<&Path> {
        match &self.sink {
            SinkConfig::Jsonl { path } => Some(path),
            SinkConfig::Memory => None,
        }
    }

    /// Apply overrides and `${VAR}` references using `lookup` for variables.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("RITQUIZ_RESULTS_PATH") {
            self.sink = SinkConfig::Jsonl {
                path: PathBuf::from(path),
            };
        }
        if let Some(max) = lookup("RITQUIZ_MAX_ITEMS") {
            self.max_items_per_session = max
                .trim()
                .parse()
                .with_context(|| format!("RITQUIZ_MAX_ITEMS is not a number: '{max}'"))?;
        }

        self.item_bank = resolve_path(&self.item_bank, &lookup);
        if let SinkConfig::Jsonl { path } = &mut self.sink {
            *path = resolve_path(path, &lookup);
        }
        Ok(())
    }
}

fn resolve_path(path: &Path, lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy(), lookup))
}

/// Resolve variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = lookup(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `ritquiz.toml` in the current directory
/// 2. `~/.config/ritquiz/config.toml`
///
/// Environment variable overrides: `RITQUIZ_RESULTS_PATH`, `RITQUIZ_MAX_ITEMS`.
pub fn load_config() -> Result<RitquizConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<RitquizConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("ritquiz.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => parse_config(path)?,
        None => RitquizConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;

    tracing::debug!(
        source = %config_path.as_deref().map_or_else(|| "defaults".to_string(), |p| p.display().to_string()),
        max_items = config.max_items_per_session,
        "configuration loaded"
    );
    Ok(config)
}

fn parse_config(path: &Path) -> Result<RitquizConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<RitquizConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("ritquiz"))
}

/// Create a sink instance from its configuration.
pub fn create_sink(config: &SinkConfig) -> Arc<dyn ResultSink> {
    match config {
        SinkConfig::Jsonl { path } => Arc::new(JsonLinesSink::new(path)),
        SinkConfig::Memory => Arc::new(MemorySink::new()),
    }
}
