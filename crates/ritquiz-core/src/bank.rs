//! TOML item bank loader.
//!
//! An item bank file carries three tables that are joined by item id:
//!
//! ```toml
//! [item_bank]
//! id = "math-growth"
//! name = "Math Growth"
//!
//! [[questions]]
//! id = "ALG-1"
//! question = "Solve for x: 2x + 3 = 11"
//! strand = "Algebra"
//! rit_band = "195-205"
//!
//! [choices]
//! ALG-1 = ["3", "4", "5", "7"]
//!
//! [keys]
//! ALG-1 = "4"
//! ```
//!
//! Rows that fail validation are rejected individually and reported. A bank
//! with rejected rows is only usable if the caller accepts it explicitly.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::BankError;
use crate::model::{Item, ItemBank, RitBand};

/// Intermediate TOML structure for item bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    #[serde(default)]
    item_bank: Option<TomlBankHeader>,
    #[serde(default)]
    questions: Vec<QuestionRow>,
    #[serde(default)]
    choices: HashMap<String, Vec<String>>,
    #[serde(default)]
    keys: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

/// One row of the question table, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRow {
    pub id: String,
    pub question: String,
    pub strand: String,
    /// Band in its textual `low-high` form.
    pub rit_band: String,
}

/// The three source tables of an item bank.
#[derive(Debug, Clone, Default)]
pub struct BankTables {
    pub questions: Vec<QuestionRow>,
    /// Item id to ordered answer choices.
    pub choices: HashMap<String, Vec<String>>,
    /// Item id to the correct choice.
    pub keys: HashMap<String, String>,
}

/// Outcome of joining and validating the bank tables.
#[derive(Debug, Clone)]
pub struct LoadedBank {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Items that passed validation, in file order.
    pub items: Vec<Item>,
    /// One error per rejected row.
    pub rejected: Vec<BankError>,
}

impl LoadedBank {
    /// Build the bank, refusing it if any row was rejected.
    pub fn into_bank(self) -> Result<ItemBank, BankError> {
        if !self.rejected.is_empty() {
            return Err(BankError::PartialBank {
                rejected: self.rejected,
            });
        }
        self.build()
    }

    /// Build the bank from whatever rows survived, logging each rejection.
    pub fn into_partial_bank(self) -> Result<ItemBank, BankError> {
        for err in &self.rejected {
            tracing::warn!("skipping item: {err}");
        }
        self.build()
    }

    fn build(self) -> Result<ItemBank, BankError> {
        Ok(ItemBank::new(self.id, self.name, self.items)?.with_description(self.description))
    }
}

/// Join the question, choice and key tables by id and validate every row.
pub fn assemble(id: &str, name: &str, tables: BankTables) -> LoadedBank {
    let BankTables {
        questions,
        choices,
        keys,
    } = tables;

    let mut items = Vec::new();
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();

    for row in questions {
        let item_id = row.id.trim().to_string();
        if !seen.insert(item_id.clone()) {
            rejected.push(BankError::DuplicateId(item_id));
            continue;
        }
        match validate_row(&item_id, &row, &choices, &keys) {
            Ok(item) => items.push(item),
            Err(e) => rejected.push(e),
        }
    }

    let orphans = choices
        .keys()
        .chain(keys.keys())
        .filter(|k| !seen.contains(k.trim()))
        .count();
    if orphans > 0 {
        tracing::debug!("{orphans} choice/key entries have no matching question");
    }

    LoadedBank {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        items,
        rejected,
    }
}

fn validate_row(
    item_id: &str,
    row: &QuestionRow,
    choices: &HashMap<String, Vec<String>>,
    keys: &HashMap<String, String>,
) -> Result<Item, BankError> {
    let question = row.question.trim();
    if question.is_empty() {
        return Err(BankError::EmptyQuestion(item_id.to_string()));
    }

    let band: RitBand = row
        .rit_band
        .parse()
        .map_err(|reason| BankError::MalformedBand {
            item_id: item_id.to_string(),
            raw: row.rit_band.clone(),
            reason,
        })?;

    let item_choices: Vec<String> = choices
        .get(item_id)
        .map(|list| {
            list.iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if item_choices.is_empty() {
        return Err(BankError::MissingChoices(item_id.to_string()));
    }

    let correct = keys
        .get(item_id)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| BankError::MissingKey(item_id.to_string()))?;
    if !item_choices.contains(&correct) {
        return Err(BankError::KeyNotInChoices {
            item_id: item_id.to_string(),
            key: correct,
        });
    }

    Ok(Item {
        id: item_id.to_string(),
        question: question.to_string(),
        strand: row.strand.trim().to_string(),
        band,
        choices: item_choices,
        correct,
    })
}

/// Parse an item bank file.
pub fn parse_item_bank(path: &Path) -> Result<LoadedBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read item bank file: {}", path.display()))?;

    parse_item_bank_str(&content, path)
}

/// Parse an item bank from a TOML string (useful for testing).
pub fn parse_item_bank_str(content: &str, source_path: &Path) -> Result<LoadedBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let (id, name, description) = match parsed.item_bank {
        Some(h) => (h.id, h.name, h.description),
        None => {
            let stem = source_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "item-bank".to_string());
            (stem.clone(), stem, String::new())
        }
    };

    let mut loaded = assemble(
        &id,
        &name,
        BankTables {
            questions: parsed.questions,
            choices: parsed.choices,
            keys: parsed.keys,
        },
    );
    loaded.description = description;
    Ok(loaded)
}

/// Load and validate an item bank file.
///
/// With `allow_partial` unset, any rejected row fails the load.
pub fn load_item_bank(path: &Path, allow_partial: bool) -> Result<ItemBank> {
    let loaded = parse_item_bank(path)?;
    let bank = if allow_partial {
        loaded.into_partial_bank()
    } else {
        loaded.into_bank()
    };
    bank.with_context(|| format!("invalid item bank: {}", path.display()))
}
