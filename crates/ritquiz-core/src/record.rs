//! Finished-session records with JSON persistence and a markdown summary.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Rit;
use crate::session::{SessionState, TrajectoryPoint};

/// Read-only snapshot of a finished session, handed to a result sink once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier.
    pub id: Uuid,
    pub username: String,
    pub grade_level: String,
    /// Selected strands, sorted.
    pub strands_selected: Vec<String>,
    pub starting_rit: Rit,
    pub final_rit: Rit,
    /// Ability after each administered item.
    pub rit_history: Vec<Rit>,
    /// Administered item ids, in order.
    pub questions_answered: Vec<String>,
    pub score_correct: u32,
    pub score_total: u32,
    /// Per-item detail.
    #[serde(default)]
    pub points: Vec<TrajectoryPoint>,
    /// When the session started, if known.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When this record was generated.
    pub timestamp: DateTime<Utc>,
}

impl SessionRecord {
    /// Package a session's state. Called once per session by
    /// [`crate::session::Session::finalize`].
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: state.username().to_string(),
            grade_level: state.grade().to_string(),
            strands_selected: state.strands().iter().cloned().collect(),
            starting_rit: state.starting_ability(),
            final_rit: state.current_ability(),
            rit_history: state.trajectory(),
            questions_answered: state.administered_ids(),
            score_correct: state.correct_count(),
            score_total: state.administered(),
            points: state.points().to_vec(),
            started_at: state.started_at(),
            timestamp: Utc::now(),
        }
    }

    /// Selected strands joined with commas.
    pub fn strands_joined(&self) -> String {
        self.strands_selected.join(",")
    }

    /// Ability trajectory joined with commas.
    pub fn rit_history_joined(&self) -> String {
        self.rit_history
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Administered item ids joined with commas.
    pub fn questions_joined(&self) -> String {
        self.questions_answered.join(",")
    }

    /// Net change from the starting ability.
    pub fn growth(&self) -> Rit {
        self.final_rit.saturating_sub(self.starting_rit)
    }

    /// Fraction of administered items answered correctly.
    pub fn accuracy(&self) -> f64 {
        if self.score_total == 0 {
            return 0.0;
        }
        self.score_correct as f64 / self.score_total as f64
    }

    /// Save the record as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize record")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write record to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read record from {}", path.display()))?;
        let record: SessionRecord =
            serde_json::from_str(&content).context("failed to parse record JSON")?;
        Ok(record)
    }

    /// Format the record as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**{}** ({}), strands: {}\n\n",
            self.username,
            self.grade_level,
            self.strands_selected.join(", ")
        ));
        md.push_str(&format!(
            "**Final RIT:** {} (started at {}, {:+})  \n**Score:** {}/{} correct\n\n",
            self.final_rit,
            self.starting_rit,
            self.growth(),
            self.score_correct,
            self.score_total
        ));

        if !self.points.is_empty() {
            md.push_str("| # | Item | Strand | Difficulty | Result | RIT |\n");
            md.push_str("|---|------|--------|------------|--------|-----|\n");
            for (i, p) in self.points.iter().enumerate() {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} -> {} |\n",
                    i + 1,
                    p.item_id,
                    p.strand,
                    p.class,
                    if p.correct { "correct" } else { "incorrect" },
                    p.ability_before,
                    p.ability_after
                ));
            }
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DifficultyClass;

    fn sample_record() -> SessionRecord {
        SessionRecord {
            id: Uuid::nil(),
            username: "ada".into(),
            grade_level: "Grade 7".into(),
            strands_selected: vec!["Algebra".into(), "Numbers".into()],
            starting_rit: 200,
            final_rit: 205,
            rit_history: vec![210, 205],
            questions_answered: vec!["Q1".into(), "Q9".into()],
            score_correct: 1,
            score_total: 2,
            points: vec![
                TrajectoryPoint {
                    item_id: "Q1".into(),
                    strand: "Algebra".into(),
                    class: DifficultyClass::AtLevel,
                    correct: true,
                    in_band: true,
                    ability_before: 200,
                    ability_after: 210,
                    delta: 10,
                },
                TrajectoryPoint {
                    item_id: "Q9".into(),
                    strand: "Numbers".into(),
                    class: DifficultyClass::Hard,
                    correct: false,
                    in_band: false,
                    ability_before: 210,
                    ability_after: 205,
                    delta: -5,
                },
            ],
            started_at: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn joined_forms() {
        let record = sample_record();
        assert_eq!(record.strands_joined(), "Algebra,Numbers");
        assert_eq!(record.rit_history_joined(), "210,205");
        assert_eq!(record.questions_joined(), "Q1,Q9");
        assert_eq!(record.growth(), 5);
        assert!((record.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn json_roundtrip() {
        let record = sample_record();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/record.json");

        record.save_json(&path).unwrap();
        let loaded = SessionRecord::load_json(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn markdown_output() {
        let md = sample_record().to_markdown();
        assert!(md.contains("**Final RIT:** 205 (started at 200, +5)"));
        assert!(md.contains("| 2 | Q9 | Numbers | hard | incorrect | 210 -> 205 |"));
    }

    #[test]
    fn accuracy_of_empty_record() {
        let mut record = sample_record();
        record.score_correct = 0;
        record.score_total = 0;
        assert_eq!(record.accuracy(), 0.0);
    }
}
