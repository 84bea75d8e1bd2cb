//! Core data model types for levelup.
//!
//! These are the fundamental types shared by the scenario bank, the
//! progression engine and the persistence layer. Field names serialize in
//! camelCase because snapshots travel over the progress API verbatim.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty tier. Each tier is a fixed-size slice of a quiz's bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Intermediate,
    Advanced,
}

impl Tier {
    /// All tiers in progression order.
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Intermediate, Tier::Advanced];

    /// Tier for a player who has already answered `total_answered` questions.
    pub fn for_index(total_answered: usize, questions_per_tier: usize) -> Tier {
        let per_tier = questions_per_tier.max(1);
        if total_answered < per_tier {
            Tier::Basic
        } else if total_answered < per_tier * 2 {
            Tier::Intermediate
        } else {
            Tier::Advanced
        }
    }

    /// Position of this tier in progression order.
    pub fn ordinal(self) -> usize {
        match self {
            Tier::Basic => 0,
            Tier::Intermediate => 1,
            Tier::Advanced => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Basic => write!(f, "basic"),
            Tier::Intermediate => write!(f, "intermediate"),
            Tier::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" | "beginner" => Ok(Tier::Basic),
            "intermediate" => Ok(Tier::Intermediate),
            "advanced" | "expert" => Ok(Tier::Advanced),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    /// Text shown to the player.
    pub text: String,
    /// Feedback shown after the option is chosen.
    #[serde(default)]
    pub outcome: String,
    /// Signed experience delta awarded for choosing this option.
    #[serde(default)]
    pub experience: i32,
    /// Explicit correctness flag. When absent on every option of a question,
    /// correctness is derived from experience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Tool granted to the player when this option is chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within a quiz.
    pub id: u32,
    /// Tier this question belongs to.
    pub level: Tier,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<QuizOption>,
}

impl Question {
    /// Indices of the options that count as correct.
    ///
    /// An explicit `is_correct = true` on any option is authoritative and
    /// every flagged option counts. Without one, the single option with the
    /// highest experience is correct, first occurrence winning ties.
    pub fn correct_option_indices(&self) -> Vec<usize> {
        let flagged: Vec<usize> = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_correct == Some(true))
            .map(|(i, _)| i)
            .collect();
        if !flagged.is_empty() {
            return flagged;
        }

        let mut best: Option<(usize, i32)> = None;
        for (i, option) in self.options.iter().enumerate() {
            match best {
                Some((_, xp)) if option.experience <= xp => {}
                _ => best = Some((i, option.experience)),
            }
        }
        best.map(|(i, _)| vec![i]).unwrap_or_default()
    }

    /// Whether the option at `index` is correct under the canonical rule.
    pub fn is_correct_option(&self, index: usize) -> bool {
        self.correct_option_indices().contains(&index)
    }
}

/// An option as presented to the player, possibly in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedOption {
    /// Index of the option in the question's declaration order.
    pub original_index: usize,
    pub option: QuizOption,
}

/// The outcome of answering one question. Appended to the history and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    /// The question that was answered.
    pub scenario: Question,
    /// The option that was selected (auto-selected on timeout).
    pub selected_answer: QuizOption,
    pub is_correct: bool,
    /// Seconds spent on the question, when a timer was running.
    #[serde(default)]
    pub time_spent: Option<u64>,
    #[serde(default)]
    pub timed_out: bool,
}

/// In-memory state of one player working through one quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub name: String,
    pub experience: u32,
    pub tools: BTreeSet<String>,
    pub current_scenario_index: usize,
    pub question_history: Vec<AnswerRecord>,
}

impl PlayerState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of correctly answered questions.
    pub fn correct_count(&self) -> usize {
        self.question_history.iter().filter(|r| r.is_correct).count()
    }
}

/// Lifecycle status of a persisted quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizStatus {
    InProgress,
    Passed,
    Failed,
    /// Legacy terminal status written by older clients.
    Completed,
}

impl QuizStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, QuizStatus::InProgress)
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizStatus::InProgress => write!(f, "in-progress"),
            QuizStatus::Passed => write!(f, "passed"),
            QuizStatus::Failed => write!(f, "failed"),
            QuizStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Persisted form of a player's progress through one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub experience: u32,
    #[serde(default)]
    pub tools: BTreeSet<String>,
    #[serde(default)]
    pub current_scenario: usize,
    #[serde(default)]
    pub question_history: Vec<AnswerRecord>,
    pub status: QuizStatus,
    #[serde(default)]
    pub score_percentage: u32,
    #[serde(default)]
    pub questions_answered: usize,
    pub last_updated: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// An empty, in-progress snapshot.
    pub fn empty() -> Self {
        Self {
            experience: 0,
            tools: BTreeSet::new(),
            current_scenario: 0,
            question_history: Vec::new(),
            status: QuizStatus::InProgress,
            score_percentage: 0,
            questions_answered: 0,
            last_updated: Utc::now(),
        }
    }

    /// Downgrade a terminal status that has no progress behind it.
    ///
    /// Returns `true` when the snapshot was repaired.
    pub fn repair_stale_terminal(&mut self) -> bool {
        if self.status.is_terminal()
            && (self.question_history.is_empty() || self.current_scenario == 0)
        {
            self.status = QuizStatus::InProgress;
            return true;
        }
        false
    }

    /// Number of correct answers in the history.
    pub fn correct_count(&self) -> usize {
        self.question_history.iter().filter(|r| r.is_correct).count()
    }
}

/// Identifies one player's progress in one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: String,
    pub quiz_id: String,
}

impl ProgressKey {
    pub fn new(user_id: impl Into<String>, quiz_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            quiz_id: quiz_id.into(),
        }
    }

    /// Local cache key for the progress snapshot.
    pub fn storage_key(&self) -> String {
        format!("quiz_progress_{}_{}", self.user_id, self.quiz_id)
    }

    /// Local cache key for the countdown resume token.
    pub fn timer_key(&self) -> String {
        format!("quiz_timer_{}_{}", self.user_id, self.quiz_id)
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.quiz_id)
    }
}

/// Cross-quiz aggregate record posted to the user profile service when a
/// quiz finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_name: String,
    /// Score percentage.
    pub score: u32,
    pub experience: u32,
    pub tools: BTreeSet<String>,
    pub question_history: Vec<AnswerRecord>,
    pub questions_answered: usize,
    pub status: QuizStatus,
}

/// Remaining countdown for a question, persisted so a reload can resume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerResumeToken {
    /// History length at the time the question was shown.
    pub question_index: usize,
    pub remaining_secs: u64,
    pub saved_at: DateTime<Utc>,
}
