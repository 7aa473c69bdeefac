//! Core data model types for ritquiz.
//!
//! Items, their RIT bands, the difficulty classes derived from them, and the
//! read-only item bank that sessions draw from.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BankError;

/// An ability estimate on the RIT scale.
pub type Rit = i32;

/// Half-open interval `[low, high)` of abilities an item is pitched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBand", into = "RawBand")]
pub struct RitBand {
    low: Rit,
    high: Rit,
}

#[derive(Serialize, Deserialize)]
struct RawBand {
    low: Rit,
    high: Rit,
}

impl TryFrom<RawBand> for RitBand {
    type Error = String;

    fn try_from(raw: RawBand) -> Result<Self, Self::Error> {
        RitBand::new(raw.low, raw.high)
    }
}

impl From<RitBand> for RawBand {
    fn from(band: RitBand) -> Self {
        RawBand {
            low: band.low,
            high: band.high,
        }
    }
}

impl RitBand {
    /// Create a band, rejecting empty or inverted intervals.
    pub fn new(low: Rit, high: Rit) -> Result<Self, String> {
        if low < high {
            Ok(Self { low, high })
        } else {
            Err(format!("low ({low}) must be below high ({high})"))
        }
    }

    pub fn low(&self) -> Rit {
        self.low
    }

    pub fn high(&self) -> Rit {
        self.high
    }

    /// Whether `ability` falls inside `[low, high)`.
    pub fn contains(&self, ability: Rit) -> bool {
        self.low <= ability && ability < self.high
    }

    /// Classify this band relative to an ability estimate.
    ///
    /// The three classes partition the ability axis: below `low` the item is
    /// hard, at or above `high` it is easy, and inside the band it is at level.
    pub fn classify(&self, ability: Rit) -> DifficultyClass {
        if ability < self.low {
            DifficultyClass::Hard
        } else if ability >= self.high {
            DifficultyClass::Easy
        } else {
            DifficultyClass::AtLevel
        }
    }
}

impl fmt::Display for RitBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

impl FromStr for RitBand {
    type Err = String;

    /// Parse the textual form `"low-high"`, e.g. `"195-205"`.
    ///
    /// Surrounding whitespace is tolerated; anything else that is not two
    /// integers with `low < high` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("band is empty".into());
        }

        // Skip the first character so a leading minus sign is not taken as
        // the separator.
        let sep = trimmed
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '-')
            .map(|(i, _)| i)
            .ok_or_else(|| "expected the form 'low-high'".to_string())?;

        let (low_str, high_str) = (trimmed[..sep].trim(), trimmed[sep + 1..].trim());
        let low: Rit = low_str
            .parse()
            .map_err(|_| format!("low bound '{low_str}' is not an integer"))?;
        let high: Rit = high_str
            .parse()
            .map_err(|_| format!("high bound '{high_str}' is not an integer"))?;

        RitBand::new(low, high)
    }
}

/// How an item's band relates to the ability estimate at administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyClass {
    Easy,
    AtLevel,
    Hard,
}

impl fmt::Display for DifficultyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyClass::Easy => write!(f, "easy"),
            DifficultyClass::AtLevel => write!(f, "at_level"),
            DifficultyClass::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for DifficultyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "easy" => Ok(DifficultyClass::Easy),
            "at_level" | "atlevel" => Ok(DifficultyClass::AtLevel),
            "hard" => Ok(DifficultyClass::Hard),
            other => Err(format!("unknown difficulty class: {other}")),
        }
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within the bank.
    pub id: String,
    /// The question shown to the test-taker.
    pub question: String,
    /// Topical tag (e.g. "Algebra").
    pub strand: String,
    /// Abilities this item is pitched at.
    pub band: RitBand,
    /// Answer choices in display order.
    pub choices: Vec<String>,
    /// The single correct choice; always one of `choices`.
    pub correct: String,
}

impl Item {
    /// Whether `answer` is the keyed choice. Surrounding whitespace is ignored.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim() == self.correct
    }
}

/// Immutable catalog of validated items.
///
/// Sessions only ever read from a bank, so one bank can be shared behind an
/// `Arc` by any number of independent sessions.
#[derive(Debug, Clone)]
pub struct ItemBank {
    /// Bank identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of this bank.
    pub description: String,
    items: Vec<Item>,
}

impl ItemBank {
    /// Build a bank from validated items. Ids must be unique and the bank
    /// non-empty; each item's key must be among its choices.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        items: Vec<Item>,
    ) -> Result<Self, BankError> {
        if items.is_empty() {
            return Err(BankError::EmptyBank);
        }

        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(BankError::DuplicateId(item.id.clone()));
            }
            if !item.choices.contains(&item.correct) {
                return Err(BankError::KeyNotInChoices {
                    item_id: item.id.clone(),
                    key: item.correct.clone(),
                });
            }
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            items,
        })
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items whose strand is in `strands`, in bank order.
    pub fn in_strands<'a, 's>(
        &'a self,
        strands: &'s BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Item> + 's
    where
        'a: 's,
    {
        self.items
            .iter()
            .filter(move |item| strands.contains(&item.strand))
    }

    /// Every strand that has at least one item, with its item count.
    pub fn strand_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.strand.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::item;

    #[test]
    fn band_parse_and_display() {
        let band: RitBand = "195-205".parse().unwrap();
        assert_eq!(band.low(), 195);
        assert_eq!(band.high(), 205);
        assert_eq!(band.to_string(), "195-205");

        let spaced: RitBand = "  180 - 190 ".parse().unwrap();
        assert_eq!(spaced, RitBand::new(180, 190).unwrap());

        let negative: RitBand = "-10-5".parse().unwrap();
        assert_eq!(negative.low(), -10);
        assert_eq!(negative.high(), 5);
    }

    #[test]
    fn band_parse_rejects_malformed() {
        assert!("".parse::<RitBand>().is_err());
        assert!("200".parse::<RitBand>().is_err());
        assert!("200-".parse::<RitBand>().is_err());
        assert!("abc-210".parse::<RitBand>().is_err());
        assert!("195.5-205".parse::<RitBand>().is_err());
        assert!("210-200".parse::<RitBand>().is_err());
        assert!("200-200".parse::<RitBand>().is_err());
    }

    #[test]
    fn band_contains_is_half_open() {
        let band = RitBand::new(195, 205).unwrap();
        assert!(!band.contains(194));
        assert!(band.contains(195));
        assert!(band.contains(204));
        assert!(!band.contains(205));
    }

    #[test]
    fn classify_edges() {
        let band = RitBand::new(195, 205).unwrap();
        assert_eq!(band.classify(194), DifficultyClass::Hard);
        assert_eq!(band.classify(195), DifficultyClass::AtLevel);
        assert_eq!(band.classify(204), DifficultyClass::AtLevel);
        assert_eq!(band.classify(205), DifficultyClass::Easy);
    }

    #[test]
    fn band_serde_rejects_inverted() {
        let ok: RitBand = serde_json::from_str(r#"{"low":1,"high":2}"#).unwrap();
        assert_eq!(ok.low(), 1);
        assert!(serde_json::from_str::<RitBand>(r#"{"low":2,"high":1}"#).is_err());
    }

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(DifficultyClass::AtLevel.to_string(), "at_level");
        assert_eq!(
            "at-level".parse::<DifficultyClass>().unwrap(),
            DifficultyClass::AtLevel
        );
        assert_eq!("HARD".parse::<DifficultyClass>().unwrap(), DifficultyClass::Hard);
        assert!("medium".parse::<DifficultyClass>().is_err());
    }

    #[test]
    fn item_answer_check_trims() {
        let it = item("Q1", "Algebra", 190, 200);
        assert!(it.is_correct("B"));
        assert!(it.is_correct("  B \n"));
        assert!(!it.is_correct("b"));
        assert!(!it.is_correct("A"));
    }

    #[test]
    fn bank_rejects_duplicates_and_empty() {
        assert_eq!(
            ItemBank::new("b", "B", vec![]).unwrap_err(),
            BankError::EmptyBank
        );
        let err = ItemBank::new(
            "b",
            "B",
            vec![item("Q1", "Algebra", 1, 2), item("Q1", "Numbers", 1, 2)],
        )
        .unwrap_err();
        assert_eq!(err, BankError::DuplicateId("Q1".into()));
    }

    #[test]
    fn bank_rejects_unkeyed_item() {
        let mut bad = item("Q1", "Algebra", 1, 2);
        bad.correct = "Z".into();
        assert!(matches!(
            ItemBank::new("b", "B", vec![bad]),
            Err(BankError::KeyNotInChoices { .. })
        ));
    }

    #[test]
    fn bank_strand_filter_and_counts() {
        let bank = ItemBank::new(
            "b",
            "B",
            vec![
                item("Q1", "Algebra", 190, 200),
                item("Q2", "Numbers", 190, 200),
                item("Q3", "Algebra", 200, 210),
            ],
        )
        .unwrap();
        let strands: BTreeSet<String> = ["Algebra".to_string()].into();
        let ids: Vec<&str> = bank.in_strands(&strands).map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q3"]);
        assert_eq!(bank.strand_counts().get("Algebra"), Some(&2));
        assert_eq!(bank.get("Q2").map(|i| i.strand.as_str()), Some("Numbers"));
        assert!(bank.get("missing").is_none());
    }

    #[test]
    fn filtered_items_outlive_the_strand_set() {
        let bank = ItemBank::new("b", "B", vec![item("Q1", "Algebra", 190, 200)]).unwrap();
        let found: Vec<&Item> = {
            let strands: BTreeSet<String> = ["Algebra".to_string()].into();
            bank.in_strands(&strands).collect()
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "Q1");
    }
}
