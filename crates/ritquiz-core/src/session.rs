//! Adaptive session state machine.
//!
//! A [`Session`] owns one test-taker's [`SessionState`] and moves it through
//! `NotStarted -> InProgress -> Finished` in response to discrete events:
//! [`Session::start`], [`Session::current_item`], [`Session::submit`],
//! [`Session::advance`], [`Session::finalize`] and [`Session::restart`].
//! Events that arrive in the wrong phase are rejected without touching state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, ValidationWarning};
use crate::model::{DifficultyClass, Item, ItemBank, Rit};
use crate::record::SessionRecord;
use crate::scorer::score;
use crate::selector::{select_item, SelectionPath};
use crate::traits::ResultSink;

/// Settings shared by every session of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Starting ability per grade label.
    pub starting_ability_by_grade: BTreeMap<String, Rit>,
    /// Items administered before the session finishes. At least 1.
    pub max_items: u32,
    /// Strands a test-taker may select.
    pub available_strands: BTreeSet<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_ability_by_grade: default_grades(),
            max_items: 15,
            available_strands: default_strands(),
        }
    }
}

/// Grades 6 through 10, all starting at 200.
pub fn default_grades() -> BTreeMap<String, Rit> {
    (6..=10).map(|g| (format!("Grade {g}"), 200)).collect()
}

pub fn default_strands() -> BTreeSet<String> {
    ["Algebra", "Measurement", "Statistics", "Numbers"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Inputs collected before a session can start.
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub username: String,
    pub grade: Option<String>,
    pub strands: BTreeSet<String>,
}

impl StartRequest {
    pub fn new(
        username: impl Into<String>,
        grade: impl Into<String>,
        strands: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            username: username.into(),
            grade: Some(grade.into()),
            strands: strands.into_iter().map(Into::into).collect(),
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Finished,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::NotStarted => write!(f, "not started"),
            SessionPhase::InProgress => write!(f, "in progress"),
            SessionPhase::Finished => write!(f, "finished"),
        }
    }
}

/// A test-taker's response to the pending item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The text of the chosen answer.
    Answer(String),
    /// No answer was given (e.g. the answer timeout expired). Scored as
    /// incorrect.
    NoAnswer,
}

/// One administered item and its effect on the ability estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub item_id: String,
    pub strand: String,
    pub class: DifficultyClass,
    pub correct: bool,
    /// `false` when the item was drawn by the out-of-band fallback.
    pub in_band: bool,
    pub ability_before: Rit,
    pub ability_after: Rit,
    pub delta: Rit,
}

/// What the UI shows after a response is scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub item_id: String,
    pub is_correct: bool,
    pub class: DifficultyClass,
    pub correct_answer: String,
    pub ability_before: Rit,
    pub ability_after: Rit,
    pub administered: u32,
    pub max_items: u32,
    /// The response completed the session.
    pub finished: bool,
}

#[derive(Debug, Clone)]
struct PendingItem {
    item: Item,
    path: SelectionPath,
}

/// Everything known about one test-taker's session.
#[derive(Debug, Clone)]
pub struct SessionState {
    username: String,
    grade: String,
    strands: BTreeSet<String>,
    starting_ability: Rit,
    current_ability: Rit,
    points: Vec<TrajectoryPoint>,
    correct_count: u32,
    max_items: u32,
    phase: SessionPhase,
    pending: Option<PendingItem>,
    awaiting_advance: bool,
    started_at: Option<DateTime<Utc>>,
    record: Option<SessionRecord>,
    persisted: bool,
}

impl SessionState {
    fn new(max_items: u32) -> Self {
        Self {
            username: String::new(),
            grade: String::new(),
            strands: BTreeSet::new(),
            starting_ability: 0,
            current_ability: 0,
            points: Vec::new(),
            correct_count: 0,
            max_items,
            phase: SessionPhase::NotStarted,
            pending: None,
            awaiting_advance: false,
            started_at: None,
            record: None,
            persisted: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn grade(&self) -> &str {
        &self.grade
    }

    pub fn strands(&self) -> &BTreeSet<String> {
        &self.strands
    }

    pub fn starting_ability(&self) -> Rit {
        self.starting_ability
    }

    pub fn current_ability(&self) -> Rit {
        self.current_ability
    }

    /// Per-item detail, in administration order.
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    /// Ability after each administered item.
    pub fn trajectory(&self) -> Vec<Rit> {
        self.points.iter().map(|p| p.ability_after).collect()
    }

    /// Ids of the administered items.
    pub fn administered_ids(&self) -> Vec<String> {
        self.points.iter().map(|p| p.item_id.clone()).collect()
    }

    pub fn administered(&self) -> u32 {
        self.points.len() as u32
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn max_items(&self) -> u32 {
        self.max_items
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn pending_item(&self) -> Option<&Item> {
        self.pending.as_ref().map(|p| &p.item)
    }

    /// Waiting for `advance` after a scored response.
    pub fn awaiting_advance(&self) -> bool {
        self.awaiting_advance
    }

    /// The record has been accepted by a result sink.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// The record built by the first `finalize` call, persisted or not.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }
}

/// One test-taker's adaptive session over a shared item bank.
#[derive(Debug)]
pub struct Session {
    bank: Arc<ItemBank>,
    config: SessionConfig,
    state: SessionState,
    rng: StdRng,
}

impl Session {
    /// Create an unstarted session with an OS-seeded random source.
    pub fn new(bank: Arc<ItemBank>, config: SessionConfig) -> Self {
        Self::with_rng(bank, config, StdRng::from_os_rng())
    }

    /// Create an unstarted session whose item draws are reproducible.
    pub fn seeded(bank: Arc<ItemBank>, config: SessionConfig, seed: u64) -> Self {
        Self::with_rng(bank, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bank: Arc<ItemBank>, config: SessionConfig, rng: StdRng) -> Self {
        let state = SessionState::new(config.max_items);
        Self {
            bank,
            config,
            state,
            rng,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn bank(&self) -> &ItemBank {
        &self.bank
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check start inputs against the configuration.
    pub fn validate(&self, request: &StartRequest) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if self.config.max_items == 0 {
            warnings.push(ValidationWarning {
                field: "max_items",
                message: "must be at least 1".into(),
            });
        }

        if request.username.trim().is_empty() {
            warnings.push(ValidationWarning {
                field: "username",
                message: "is required".into(),
            });
        }

        match request.grade.as_deref().map(str::trim) {
            None | Some("") => warnings.push(ValidationWarning {
                field: "grade",
                message: "is required".into(),
            }),
            Some(grade) if !self.config.starting_ability_by_grade.contains_key(grade) => {
                warnings.push(ValidationWarning {
                    field: "grade",
                    message: format!(
                        "unknown grade '{grade}' (expected one of: {})",
                        join(self.config.starting_ability_by_grade.keys())
                    ),
                })
            }
            Some(_) => {}
        }

        if request.strands.is_empty() {
            warnings.push(ValidationWarning {
                field: "strands",
                message: "select at least one strand".into(),
            });
        }
        for strand in &request.strands {
            if !self.config.available_strands.contains(strand) {
                warnings.push(ValidationWarning {
                    field: "strands",
                    message: format!(
                        "unknown strand '{strand}' (expected one of: {})",
                        join(&self.config.available_strands)
                    ),
                });
            }
        }

        warnings
    }

    /// Begin the session.
    ///
    /// Invalid inputs yield [`SessionError::Validation`] and a bank with no
    /// item in the selected strands yields [`SessionError::NoMatchingItems`];
    /// in both cases the session stays `NotStarted` and can be retried.
    pub fn start(&mut self, request: StartRequest) -> Result<(), SessionError> {
        self.expect_phase("start", SessionPhase::NotStarted)?;

        let warnings = self.validate(&request);
        if !warnings.is_empty() {
            return Err(SessionError::Validation(warnings));
        }

        if self.bank.in_strands(&request.strands).next().is_none() {
            return Err(SessionError::NoMatchingItems {
                strands: request.strands.into_iter().collect(),
            });
        }

        let grade = request.grade.unwrap_or_default().trim().to_string();
        let starting_ability = self
            .config
            .starting_ability_by_grade
            .get(&grade)
            .copied()
            .unwrap_or_default();

        let mut state = SessionState::new(self.config.max_items);
        state.username = request.username.trim().to_string();
        state.grade = grade;
        state.strands = request.strands;
        state.starting_ability = starting_ability;
        state.current_ability = starting_ability;
        state.phase = SessionPhase::InProgress;
        state.started_at = Some(Utc::now());
        self.state = state;

        tracing::info!(
            username = %self.state.username,
            grade = %self.state.grade,
            strands = %join(&self.state.strands),
            starting_ability,
            "session started"
        );
        Ok(())
    }

    /// The item awaiting a response, selecting one if none is pending.
    pub fn current_item(&mut self) -> Result<&Item, SessionError> {
        self.expect_phase("current_item", SessionPhase::InProgress)?;
        if self.state.awaiting_advance {
            return Err(self.invalid("current_item"));
        }

        if self.state.pending.is_none() {
            let selection = select_item(
                &self.bank,
                self.state.current_ability,
                &self.state.strands,
                &mut self.rng,
            )?;
            if selection.path == SelectionPath::Fallback {
                tracing::debug!(
                    ability = self.state.current_ability,
                    "no band brackets the estimate, drew from all selected strands"
                );
            }
            self.state.pending = Some(PendingItem {
                item: selection.item.clone(),
                path: selection.path,
            });
        }

        match &self.state.pending {
            Some(pending) => Ok(&pending.item),
            None => Err(self.invalid("current_item")),
        }
    }

    /// Score a response to the pending item.
    ///
    /// Finishes the session when the last item has been administered;
    /// otherwise the session waits for [`Session::advance`].
    pub fn submit(&mut self, response: Response) -> Result<Feedback, SessionError> {
        self.expect_phase("submit", SessionPhase::InProgress)?;
        let Some(pending) = self.state.pending.take() else {
            return Err(self.invalid("submit"));
        };

        let is_correct = match &response {
            Response::Answer(answer) => pending.item.is_correct(answer),
            Response::NoAnswer => false,
        };
        let ability_before = self.state.current_ability;
        let outcome = score(pending.item.band, ability_before, is_correct);

        self.state.current_ability = outcome.new_ability;
        if is_correct {
            self.state.correct_count += 1;
        }
        self.state.points.push(TrajectoryPoint {
            item_id: pending.item.id.clone(),
            strand: pending.item.strand.clone(),
            class: outcome.class,
            correct: is_correct,
            in_band: pending.path == SelectionPath::Banded,
            ability_before,
            ability_after: outcome.new_ability,
            delta: outcome.delta,
        });

        let administered = self.state.administered();
        let finished = administered >= self.state.max_items;
        if finished {
            self.state.phase = SessionPhase::Finished;
            tracing::info!(
                username = %self.state.username,
                final_ability = self.state.current_ability,
                correct = self.state.correct_count,
                total = administered,
                "session finished"
            );
        } else {
            self.state.awaiting_advance = true;
        }

        tracing::debug!(
            item = %pending.item.id,
            class = %outcome.class,
            correct = is_correct,
            ability_before,
            ability_after = outcome.new_ability,
            "scored response"
        );

        Ok(Feedback {
            item_id: pending.item.id,
            is_correct,
            class: outcome.class,
            correct_answer: pending.item.correct,
            ability_before,
            ability_after: outcome.new_ability,
            administered,
            max_items: self.state.max_items,
            finished,
        })
    }

    /// Move on to the next round after feedback has been shown.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.expect_phase("advance", SessionPhase::InProgress)?;
        if !self.state.awaiting_advance {
            return Err(self.invalid("advance"));
        }
        self.state.awaiting_advance = false;
        Ok(())
    }

    /// Build the session record and hand it to `sink`, at most once.
    ///
    /// Once the sink has accepted the record, later calls return it without
    /// touching the sink again. If the sink fails, the session is left
    /// unpersisted and the call can be retried.
    pub async fn finalize(
        &mut self,
        sink: &dyn ResultSink,
    ) -> Result<SessionRecord, SessionError> {
        self.expect_phase("finalize", SessionPhase::Finished)?;

        let record = match &self.state.record {
            Some(record) => record.clone(),
            None => {
                let record = SessionRecord::from_state(&self.state);
                self.state.record = Some(record.clone());
                record
            }
        };

        if self.state.persisted {
            tracing::debug!(session = %record.id, "record already persisted");
            return Ok(record);
        }

        match sink.append(&record).await {
            Ok(()) => {
                self.state.persisted = true;
                tracing::info!(session = %record.id, sink = sink.name(), "record persisted");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(session = %record.id, sink = sink.name(), "persist failed: {e:#}");
                Err(SessionError::PersistenceFailure(format!("{e:#}")))
            }
        }
    }

    /// Discard the current state and return to `NotStarted`.
    pub fn restart(&mut self) {
        if self.state.phase == SessionPhase::InProgress {
            tracing::info!(
                username = %self.state.username,
                administered = self.state.administered(),
                "session abandoned by restart"
            );
        }
        self.state = SessionState::new(self.config.max_items);
    }

    fn expect_phase(&self, event: &'static str, phase: SessionPhase) -> Result<(), SessionError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(self.invalid(event))
        }
    }

    fn invalid(&self, event: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            event,
            phase: self.state.phase,
        }
    }
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
