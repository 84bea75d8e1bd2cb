//! Experience and correctness bookkeeping.
//!
//! The percentage always uses the fixed quiz length as denominator, so an
//! early run of correct answers never reads as a high score.

use crate::error::QuizError;
use crate::model::{AnswerRecord, PlayerState, ProgressSnapshot, Question};

/// How an answer was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerTiming {
    /// Seconds spent on the question.
    pub time_spent: Option<u64>,
    /// The countdown expired and the option was chosen automatically.
    pub timed_out: bool,
}

/// Percentage of `correct` answers out of `total_questions`, rounded.
pub fn score_percentage(correct: usize, total_questions: usize) -> u32 {
    if total_questions == 0 {
        return 0;
    }
    ((correct as f64 / total_questions as f64) * 100.0).round() as u32
}

/// Running experience total and answer ledger for one player.
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    player: PlayerState,
    total_questions: usize,
    max_xp: u32,
}

impl ScoreAccumulator {
    pub fn new(player: PlayerState, total_questions: usize, max_xp: u32) -> Self {
        Self {
            player,
            total_questions,
            max_xp,
        }
    }

    /// Rebuild the accumulator from a persisted snapshot.
    pub fn from_snapshot(
        name: impl Into<String>,
        snapshot: &ProgressSnapshot,
        total_questions: usize,
        max_xp: u32,
    ) -> Self {
        let player = PlayerState {
            name: name.into(),
            experience: snapshot.experience.min(max_xp),
            tools: snapshot.tools.clone(),
            current_scenario_index: snapshot.question_history.len(),
            question_history: snapshot.question_history.clone(),
        };
        Self::new(player, total_questions, max_xp)
    }

    /// Record an answer to `question` and return the appended record.
    ///
    /// A timed-out answer is always incorrect and earns no experience or
    /// tool, whichever option was auto-selected.
    pub fn record_answer(
        &mut self,
        question: &Question,
        option_index: usize,
        timing: AnswerTiming,
    ) -> Result<AnswerRecord, QuizError> {
        let option = question
            .options
            .get(option_index)
            .ok_or(QuizError::InvalidOption {
                index: option_index,
                count: question.options.len(),
            })?;

        let (is_correct, delta) = if timing.timed_out {
            (false, 0)
        } else {
            (question.is_correct_option(option_index), option.experience)
        };

        let experience = (i64::from(self.player.experience) + i64::from(delta))
            .clamp(0, i64::from(self.max_xp));
        self.player.experience = experience as u32;

        if !timing.timed_out {
            if let Some(tool) = &option.tool {
                self.player.tools.insert(tool.clone());
            }
        }

        let record = AnswerRecord {
            scenario: question.clone(),
            selected_answer: option.clone(),
            is_correct,
            time_spent: timing.time_spent,
            timed_out: timing.timed_out,
        };
        self.player.question_history.push(record.clone());
        self.player.current_scenario_index = self.player.question_history.len();
        Ok(record)
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn answered(&self) -> usize {
        self.player.question_history.len()
    }

    pub fn correct_count(&self) -> usize {
        self.player.correct_count()
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    pub fn score_percentage(&self) -> u32 {
        score_percentage(self.correct_count(), self.total_questions)
    }

    pub fn is_complete(&self) -> bool {
        self.answered() >= self.total_questions
    }

    /// Whether the finished quiz meets `pass_percentage`. Always `false`
    /// before completion.
    pub fn passed(&self, pass_percentage: u32) -> bool {
        self.is_complete() && self.score_percentage() >= pass_percentage
    }
}
