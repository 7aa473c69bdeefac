//! Aggregate statistics over a batch of finished sessions.

use serde::{Deserialize, Serialize};

use crate::model::{DifficultyClass, Rit};
use crate::record::SessionRecord;

/// How often each difficulty class was administered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub easy: usize,
    pub at_level: usize,
    pub hard: usize,
}

impl ClassCounts {
    fn add(&mut self, class: DifficultyClass) {
        match class {
            DifficultyClass::Easy => self.easy += 1,
            DifficultyClass::AtLevel => self.at_level += 1,
            DifficultyClass::Hard => self.hard += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.easy + self.at_level + self.hard
    }
}

/// Summary of a cohort of sessions taken at one true ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortStats {
    pub sessions: usize,
    pub true_ability: Rit,
    pub mean_final: f64,
    pub std_dev_final: f64,
    pub min_final: Rit,
    pub max_final: Rit,
    /// Mean of `|final - true_ability|`.
    pub mean_abs_error: f64,
    /// Mean fraction answered correctly.
    pub mean_accuracy: f64,
    /// Fraction of items drawn from a band that bracketed the estimate.
    pub in_band_rate: f64,
    pub classes: ClassCounts,
    /// Mean ability after each item position.
    pub mean_trajectory: Vec<f64>,
}

/// Compute cohort statistics. Returns `None` for an empty batch.
pub fn compute_cohort_stats(records: &[SessionRecord], true_ability: Rit) -> Option<CohortStats> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;

    let finals: Vec<f64> = records.iter().map(|r| r.final_rit as f64).collect();
    let mean_final = finals.iter().sum::<f64>() / n;
    let variance = finals.iter().map(|f| (f - mean_final).powi(2)).sum::<f64>() / n;

    let mean_abs_error = records
        .iter()
        .map(|r| (r.final_rit as f64 - true_ability as f64).abs())
        .sum::<f64>()
        / n;
    let mean_accuracy = records.iter().map(SessionRecord::accuracy).sum::<f64>() / n;

    let mut classes = ClassCounts::default();
    let mut in_band = 0usize;
    for point in records.iter().flat_map(|r| &r.points) {
        classes.add(point.class);
        if point.in_band {
            in_band += 1;
        }
    }
    let in_band_rate = if classes.total() == 0 {
        0.0
    } else {
        in_band as f64 / classes.total() as f64
    };

    let longest = records.iter().map(|r| r.rit_history.len()).max().unwrap_or(0);
    let mean_trajectory = (0..longest)
        .map(|i| {
            let at: Vec<f64> = records
                .iter()
                .filter_map(|r| r.rit_history.get(i))
                .map(|&v| v as f64)
                .collect();
            at.iter().sum::<f64>() / at.len() as f64
        })
        .collect();

    Some(CohortStats {
        sessions: records.len(),
        true_ability,
        mean_final,
        std_dev_final: variance.sqrt(),
        min_final: records.iter().map(|r| r.final_rit).min().unwrap_or_default(),
        max_final: records.iter().map(|r| r.final_rit).max().unwrap_or_default(),
        mean_abs_error,
        mean_accuracy,
        in_band_rate,
        classes,
        mean_trajectory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TrajectoryPoint;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(history: &[Rit], correct: &[bool]) -> SessionRecord {
        let mut before = 200;
        let points = history
            .iter()
            .zip(correct)
            .map(|(&after, &ok)| {
                let p = TrajectoryPoint {
                    item_id: "Q".into(),
                    strand: "Algebra".into(),
                    class: DifficultyClass::AtLevel,
                    correct: ok,
                    in_band: ok,
                    ability_before: before,
                    ability_after: after,
                    delta: after - before,
                };
                before = after;
                p
            })
            .collect();
        SessionRecord {
            id: Uuid::new_v4(),
            username: "sim".into(),
            grade_level: "Grade 6".into(),
            strands_selected: vec!["Algebra".into()],
            starting_rit: 200,
            final_rit: *history.last().unwrap(),
            rit_history: history.to_vec(),
            questions_answered: vec!["Q".into(); history.len()],
            score_correct: correct.iter().filter(|&&c| c).count() as u32,
            score_total: history.len() as u32,
            points,
            started_at: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_batch() {
        assert!(compute_cohort_stats(&[], 200).is_none());
    }

    #[test]
    fn basic_stats() {
        let records = vec![
            record(&[210, 220], &[true, true]),
            record(&[190, 200], &[false, true]),
        ];
        let stats = compute_cohort_stats(&records, 215).unwrap();
        assert_eq!(stats.sessions, 2);
        assert!((stats.mean_final - 210.0).abs() < 1e-9);
        assert!((stats.std_dev_final - 10.0).abs() < 1e-9);
        assert_eq!(stats.min_final, 200);
        assert_eq!(stats.max_final, 220);
        assert!((stats.mean_abs_error - 10.0).abs() < 1e-9);
        assert!((stats.mean_accuracy - 0.75).abs() < 1e-9);
        assert!((stats.in_band_rate - 0.75).abs() < 1e-9);
        assert_eq!(stats.classes.at_level, 4);
        assert_eq!(stats.mean_trajectory, vec![200.0, 210.0]);
    }

    #[test]
    fn trajectories_of_unequal_length() {
        let records = vec![record(&[210], &[true]), record(&[190, 180], &[false, false])];
        let stats = compute_cohort_stats(&records, 200).unwrap();
        assert_eq!(stats.mean_trajectory, vec![200.0, 180.0]);
    }
}
