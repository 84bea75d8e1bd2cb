//! Quiz progression state machine.
//!
//! One generic engine drives every quiz; per-topic behavior lives entirely in
//! the `ScenarioBank` it is given.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::bank::ScenarioBank;
use crate::error::QuizError;
use crate::model::{
    AnswerRecord, PlayerState, ProgressKey, ProgressSnapshot, Question, QuizResult, QuizStatus,
    Tier,
};
use crate::scoring::{AnswerTiming, ScoreAccumulator};
use crate::traits::ProgressGateway;

/// Scoring parameters for a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Number of answers that completes the quiz. Set from the bank by
    /// `for_bank`; not read from config files.
    #[serde(skip, default = "default_total_questions")]
    pub total_questions: usize,
    /// Minimum score percentage to pass.
    #[serde(default = "default_pass_percentage")]
    pub pass_percentage: u32,
    /// Experience cap.
    #[serde(default = "default_max_xp")]
    pub max_xp: u32,
}

fn default_total_questions() -> usize {
    15
}
fn default_pass_percentage() -> u32 {
    70
}
fn default_max_xp() -> u32 {
    300
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            total_questions: default_total_questions(),
            pass_percentage: default_pass_percentage(),
            max_xp: default_max_xp(),
        }
    }
}

impl QuizConfig {
    /// Apply a bank's own overrides. The bank's size always wins for the
    /// question count.
    pub fn for_bank(&self, bank: &ScenarioBank) -> QuizConfig {
        QuizConfig {
            total_questions: bank.total_questions(),
            pass_percentage: bank.pass_percentage.unwrap_or(self.pass_percentage),
            max_xp: bank.max_xp.unwrap_or(self.max_xp),
        }
    }
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    InProgress,
    Passed,
    Failed,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Passed | EngineState::Failed)
    }
}

/// What `start` did with the restored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// Number of answers already on record.
    pub resumed_at: usize,
    /// Status of a finished attempt that was found and set aside.
    pub previous_status: Option<QuizStatus>,
}

/// The next thing to show the player.
#[derive(Debug, Clone, PartialEq)]
pub enum NextQuestion<'a> {
    Question(&'a Question),
    Terminal(QuizStatus),
}

/// Result of a recorded answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub record: AnswerRecord,
    /// Tier the player just entered, when this answer crossed a boundary.
    pub level_transition: Option<Tier>,
    /// Final snapshot, when this answer finished the quiz.
    pub finished: Option<ProgressSnapshot>,
    /// Whether the gateway stored the new snapshot.
    pub saved: bool,
}

/// Drives one player through one quiz.
pub struct ProgressionEngine {
    bank: Arc<ScenarioBank>,
    config: QuizConfig,
    gateway: Arc<dyn ProgressGateway>,
    key: ProgressKey,
    player_name: String,
    scores: ScoreAccumulator,
    state: EngineState,
}

impl ProgressionEngine {
    pub fn new(
        bank: Arc<ScenarioBank>,
        config: QuizConfig,
        gateway: Arc<dyn ProgressGateway>,
        key: ProgressKey,
    ) -> Self {
        let player_name = key.user_id.clone();
        let scores = ScoreAccumulator::new(
            PlayerState::new(player_name.clone()),
            config.total_questions,
            config.max_xp,
        );
        Self {
            bank,
            config,
            gateway,
            key,
            player_name,
            scores,
            state: EngineState::NotStarted,
        }
    }

    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = name.into();
        self
    }

    /// Begin the quiz, resuming from `restored` when it is usable.
    ///
    /// A restored attempt that already finished is set aside and a fresh
    /// attempt begins; its status is reported in the outcome.
    pub fn start(&mut self, restored: Option<ProgressSnapshot>) -> StartOutcome {
        self.state = EngineState::NotStarted;
        let mut previous_status = None;

        let resumed = match restored {
            Some(snapshot) if !self.matches_bank(&snapshot) => {
                tracing::warn!(
                    "discarding saved progress for {}: history does not match the quiz bank",
                    self.key
                );
                None
            }
            Some(snapshot) if snapshot.question_history.len() >= self.config.total_questions => {
                let scores = ScoreAccumulator::from_snapshot(
                    self.player_name.clone(),
                    &snapshot,
                    self.config.total_questions,
                    self.config.max_xp,
                );
                previous_status = Some(if scores.passed(self.config.pass_percentage) {
                    QuizStatus::Passed
                } else {
                    QuizStatus::Failed
                });
                None
            }
            other => other,
        };

        self.scores = match &resumed {
            Some(snapshot) => ScoreAccumulator::from_snapshot(
                self.player_name.clone(),
                snapshot,
                self.config.total_questions,
                self.config.max_xp,
            ),
            None => ScoreAccumulator::new(
                PlayerState::new(self.player_name.clone()),
                self.config.total_questions,
                self.config.max_xp,
            ),
        };
        self.state = EngineState::InProgress;

        let resumed_at = self.scores.answered();
        tracing::info!(quiz = %self.key, resumed_at, "quiz started");
        StartOutcome {
            resumed_at,
            previous_status,
        }
    }

    /// Load saved progress through the gateway and start from it.
    pub async fn start_from_gateway(&mut self) -> StartOutcome {
        let restored = self.gateway.load(&self.key).await;
        self.start(restored)
    }

    /// Discard all progress and begin again from the first question.
    pub async fn restart(&mut self) -> bool {
        self.start(None);
        let snapshot = self.snapshot();
        self.persist(&snapshot).await
    }

    /// The question to show next, or the terminal status.
    pub fn next_question(&self) -> Result<NextQuestion<'_>, QuizError> {
        match self.state {
            EngineState::NotStarted => Err(QuizError::NotInProgress),
            EngineState::Passed => Ok(NextQuestion::Terminal(QuizStatus::Passed)),
            EngineState::Failed => Ok(NextQuestion::Terminal(QuizStatus::Failed)),
            EngineState::InProgress => self
                .bank
                .question_for_index(self.scores.answered())
                .map(NextQuestion::Question),
        }
    }

    /// Record an answer to the current question and persist the new state.
    ///
    /// When `timed_out` is set the answer is incorrect and earns nothing,
    /// whichever option was selected.
    pub async fn submit_answer(
        &mut self,
        option_index: usize,
        timed_out: bool,
        time_spent: Option<u64>,
    ) -> Result<SubmitOutcome, QuizError> {
        if self.state != EngineState::InProgress {
            return Err(QuizError::NotInProgress);
        }

        let bank = Arc::clone(&self.bank);
        let answered = self.scores.answered();
        let question = bank.question_for_index(answered)?;
        let record = self.scores.record_answer(
            question,
            option_index,
            AnswerTiming {
                time_spent,
                timed_out,
            },
        )?;

        let answered = self.scores.answered();
        let per_tier = bank.questions_per_tier();
        let level_transition = (answered < self.config.total_questions
            && answered % per_tier == 0)
            .then(|| bank.tier_for_index(answered));

        let finished = self.check_termination();
        let snapshot = match &finished {
            Some(snapshot) => snapshot.clone(),
            None => self.snapshot(),
        };
        let saved = self.persist(&snapshot).await;

        if let Some(final_snapshot) = &finished {
            let result = self.result_for(final_snapshot);
            self.gateway.submit_result(&self.key, &result).await;
        }

        Ok(SubmitOutcome {
            record,
            level_transition,
            finished,
            saved,
        })
    }

    /// Move to Passed/Failed once every question is answered. Returns the
    /// final snapshot on the transition.
    pub fn check_termination(&mut self) -> Option<ProgressSnapshot> {
        if self.state != EngineState::InProgress || !self.scores.is_complete() {
            return None;
        }

        self.state = if self.scores.passed(self.config.pass_percentage) {
            EngineState::Passed
        } else {
            EngineState::Failed
        };
        tracing::info!(
            quiz = %self.key,
            score = self.scores.score_percentage(),
            state = ?self.state,
            "quiz finished"
        );
        Some(self.snapshot())
    }

    /// Current progress in persisted form. Status, percentage and counters
    /// are derived from the history.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let player = self.scores.player();
        ProgressSnapshot {
            experience: player.experience,
            tools: player.tools.clone(),
            current_scenario: player.question_history.len(),
            question_history: player.question_history.clone(),
            status: self.derived_status(),
            score_percentage: self.scores.score_percentage(),
            questions_answered: player.question_history.len(),
            last_updated: Utc::now(),
        }
    }

    fn derived_status(&self) -> QuizStatus {
        if !self.scores.is_complete() {
            QuizStatus::InProgress
        } else if self.scores.passed(self.config.pass_percentage) {
            QuizStatus::Passed
        } else {
            QuizStatus::Failed
        }
    }

    fn result_for(&self, snapshot: &ProgressSnapshot) -> QuizResult {
        QuizResult {
            quiz_name: self.bank.name.clone(),
            score: snapshot.score_percentage,
            experience: snapshot.experience,
            tools: snapshot.tools.clone(),
            question_history: snapshot.question_history.clone(),
            questions_answered: snapshot.questions_answered,
            status: snapshot.status,
        }
    }

    /// Whether every record of `snapshot` answers the question the bank puts
    /// at that position.
    fn matches_bank(&self, snapshot: &ProgressSnapshot) -> bool {
        snapshot.question_history.len() <= self.config.total_questions
            && snapshot
                .question_history
                .iter()
                .enumerate()
                .all(|(i, record)| {
                    self.bank
                        .question_for_index(i)
                        .is_ok_and(|q| q.id == record.scenario.id)
                })
    }

    async fn persist(&self, snapshot: &ProgressSnapshot) -> bool {
        match self.gateway.save(&self.key, snapshot).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to save progress for {}: {e:#}", self.key);
                false
            }
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn scores(&self) -> &ScoreAccumulator {
        &self.scores
    }

    pub fn bank(&self) -> &ScenarioBank {
        &self.bank
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn key(&self) -> &ProgressKey {
        &self.key
    }

    pub fn gateway(&self) -> &Arc<dyn ProgressGateway> {
        &self.gateway
    }
}
