//! Async session driver.
//!
//! Runs one [`Session`] round by round against a [`QuizUi`] port, bounding
//! the wait for each answer if configured, and hands the finished record to
//! a [`ResultSink`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::ItemBank;
use crate::record::SessionRecord;
use crate::session::{Response, Session, SessionConfig, SessionPhase, StartRequest};
use crate::traits::{QuizUi, ResultSink};

/// What to do when the answer timeout expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Score the item as unanswered (incorrect) and carry on.
    #[default]
    NoAnswer,
    /// Abandon the session; nothing is persisted.
    Abandon,
}

/// Configuration for the session runner.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Longest wait for an answer. `None` waits indefinitely.
    pub answer_timeout: Option<Duration>,
    pub timeout_policy: TimeoutPolicy,
    /// Seed for reproducible item draws.
    pub seed: Option<u64>,
}

/// Drives sessions over a shared item bank.
pub struct SessionRunner {
    bank: Arc<ItemBank>,
    sink: Arc<dyn ResultSink>,
    session_config: SessionConfig,
    config: RunnerConfig,
}

impl SessionRunner {
    pub fn new(
        bank: Arc<ItemBank>,
        sink: Arc<dyn ResultSink>,
        session_config: SessionConfig,
        config: RunnerConfig,
    ) -> Self {
        Self {
            bank,
            sink,
            session_config,
            config,
        }
    }

    pub fn bank(&self) -> &Arc<ItemBank> {
        &self.bank
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// Create an unstarted session using this runner's bank and seed.
    pub fn new_session(&self) -> Session {
        match self.config.seed {
            Some(seed) => Session::seeded(
                Arc::clone(&self.bank),
                self.session_config.clone(),
                seed,
            ),
            None => Session::new(Arc::clone(&self.bank), self.session_config.clone()),
        }
    }

    /// Start a session, or return why it could not start.
    pub fn begin(&self, request: StartRequest) -> Result<Session, SessionError> {
        let mut session = self.new_session();
        session.start(request)?;
        Ok(session)
    }

    /// Start and drive a session to completion.
    ///
    /// The session is dropped on any error. Use [`SessionRunner::begin`] and
    /// [`SessionRunner::drive`] to keep it for a persistence retry.
    pub async fn run(
        &self,
        request: StartRequest,
        ui: &mut dyn QuizUi,
    ) -> anyhow::Result<SessionRecord> {
        let mut session = self.begin(request)?;
        self.drive(&mut session, ui).await
    }

    /// Drive a started session to completion and persist its record.
    ///
    /// Abandonment (closed input, or a timeout under
    /// [`TimeoutPolicy::Abandon`]) returns [`SessionError::Abandoned`] and
    /// persists nothing. A [`SessionError::PersistenceFailure`] leaves the
    /// session finished with its record cached; [`SessionRunner::persist`]
    /// retries it.
    pub async fn drive(
        &self,
        session: &mut Session,
        ui: &mut dyn QuizUi,
    ) -> anyhow::Result<SessionRecord> {
        while session.phase() == SessionPhase::InProgress {
            let state = session.state();
            let (administered, max_items) = (state.administered(), state.max_items());
            ui.present_progress(administered, max_items).await?;

            let item = session.current_item()?.clone();
            let number = administered + 1;

            let answer = match self.config.answer_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, ui.present_item(&item, number, max_items))
                        .await
                    {
                        Ok(answer) => answer?.map(Response::Answer),
                        Err(_) => {
                            tracing::warn!(
                                item = %item.id,
                                timeout_secs = limit.as_secs_f64(),
                                policy = ?self.config.timeout_policy,
                                "answer timed out"
                            );
                            match self.config.timeout_policy {
                                TimeoutPolicy::NoAnswer => Some(Response::NoAnswer),
                                TimeoutPolicy::Abandon => None,
                            }
                        }
                    }
                }
                None => ui
                    .present_item(&item, number, max_items)
                    .await?
                    .map(Response::Answer),
            };

            let Some(response) = answer else {
                return Err(abandon(session).into());
            };

            let feedback = session.submit(response)?;
            ui.present_feedback(&feedback).await?;

            if !feedback.finished {
                ui.await_advance().await?;
                session.advance()?;
            }
        }

        let record = self.persist(session).await?;
        ui.present_final(record.final_rit, &record.rit_history)
            .await?;
        Ok(record)
    }

    /// Hand a finished session's record to the sink.
    ///
    /// Safe to call again after a failure; the sink sees the same record and
    /// accepts it at most once.
    pub async fn persist(&self, session: &mut Session) -> Result<SessionRecord, SessionError> {
        session.finalize(self.sink.as_ref()).await
    }
}

fn abandon(session: &Session) -> SessionError {
    let administered = session.state().administered() as usize;
    tracing::info!(
        username = %session.state().username(),
        administered,
        "session abandoned; nothing persisted"
    );
    SessionError::Abandoned { administered }
}
