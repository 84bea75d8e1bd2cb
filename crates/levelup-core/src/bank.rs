//! Scenario banks and the TOML bank loader.
//!
//! A bank is the question catalog of one quiz topic: three tiers of
//! `questions_per_tier` questions each, kept in declaration order.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::QuizError;
use crate::model::{PresentedOption, Question, QuizOption, Tier};

/// Default number of questions in each tier.
pub const DEFAULT_QUESTIONS_PER_TIER: usize = 5;

/// Static question catalog for one quiz.
#[derive(Debug, Clone)]
pub struct ScenarioBank {
    /// Quiz identifier, used in storage keys and API paths.
    pub id: String,
    /// Human-readable quiz name.
    pub name: String,
    pub description: String,
    /// Pass threshold override for this quiz.
    pub pass_percentage: Option<u32>,
    /// Experience cap override for this quiz.
    pub max_xp: Option<u32>,
    questions_per_tier: usize,
    tiers: [Vec<Question>; 3],
}

impl ScenarioBank {
    /// Build a bank, grouping questions by their level in declaration order.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        questions: Vec<Question>,
        questions_per_tier: usize,
    ) -> Self {
        let mut tiers: [Vec<Question>; 3] = Default::default();
        for question in questions {
            tiers[question.level.ordinal()].push(question);
        }
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            pass_percentage: None,
            max_xp: None,
            questions_per_tier: questions_per_tier.max(1),
            tiers,
        }
    }

    pub fn questions_per_tier(&self) -> usize {
        self.questions_per_tier
    }

    /// Number of questions a full run through the bank answers.
    pub fn total_questions(&self) -> usize {
        self.questions_per_tier * Tier::ALL.len()
    }

    /// Tier active after `total_answered` answers.
    pub fn tier_for_index(&self, total_answered: usize) -> Tier {
        Tier::for_index(total_answered, self.questions_per_tier)
    }

    /// Questions of one tier.
    pub fn tier(&self, tier: Tier) -> &[Question] {
        &self.tiers[tier.ordinal()]
    }

    /// Question at `index_within_tier` of `tier`.
    pub fn question(&self, tier: Tier, index_within_tier: usize) -> Result<&Question, QuizError> {
        let questions = self.tier(tier);
        questions
            .get(index_within_tier)
            .ok_or(QuizError::OutOfRange {
                tier,
                index: index_within_tier,
                len: questions.len(),
            })
    }

    /// Question shown to a player who has answered `total_answered` questions.
    pub fn question_for_index(&self, total_answered: usize) -> Result<&Question, QuizError> {
        let tier = self.tier_for_index(total_answered);
        self.question(tier, total_answered % self.questions_per_tier)
    }

    /// All questions, tier by tier.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.tiers.iter().flatten()
    }
}

/// Options of `question` in presentation order, each tagged with its
/// declaration index.
pub fn present_options(question: &Question, shuffle: bool) -> Vec<PresentedOption> {
    let mut presented: Vec<PresentedOption> = question
        .options
        .iter()
        .cloned()
        .enumerate()
        .map(|(original_index, option)| PresentedOption {
            original_index,
            option,
        })
        .collect();
    if shuffle {
        presented.shuffle(&mut rand::rng());
    }
    presented
}

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    pass_percentage: Option<u32>,
    #[serde(default)]
    max_xp: Option<u32>,
    #[serde(default = "default_questions_per_tier")]
    questions_per_tier: usize,
}

fn default_questions_per_tier() -> usize {
    DEFAULT_QUESTIONS_PER_TIER
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: u32,
    level: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    text: String,
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    experience: i32,
    #[serde(default)]
    is_correct: Option<bool>,
    #[serde(default)]
    tool: Option<String>,
}

/// Parse a single TOML file into a `ScenarioBank`.
pub fn parse_bank(path: &Path) -> Result<ScenarioBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `ScenarioBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<ScenarioBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    anyhow::ensure!(
        parsed.quiz.questions_per_tier > 0,
        "questions_per_tier must be at least 1 in {}",
        source_path.display()
    );

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let level: Tier = q
                .level
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;

            let options = q
                .options
                .into_iter()
                .map(|o| QuizOption {
                    text: o.text,
                    outcome: o.outcome,
                    experience: o.experience,
                    is_correct: o.is_correct,
                    tool: o.tool,
                })
                .collect();

            Ok(Question {
                id: q.id,
                level,
                title: q.title,
                description: q.description,
                options,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut bank = ScenarioBank::new(
        parsed.quiz.id,
        parsed.quiz.name,
        questions,
        parsed.quiz.questions_per_tier,
    );
    bank.description = parsed.quiz.description;
    bank.pass_percentage = parsed.quiz.pass_percentage;
    bank.max_xp = parsed.quiz.max_xp;
    Ok(bank)
}

/// Recursively load all `.toml` banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<ScenarioBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or every bank in a directory.
pub fn load_banks(path: &Path) -> Result<Vec<ScenarioBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<u32>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for common authoring mistakes.
pub fn validate_bank(bank: &ScenarioBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for tier in Tier::ALL {
        let len = bank.tier(tier).len();
        if len != bank.questions_per_tier() {
            warnings.push(ValidationWarning {
                question_id: None,
                message: format!(
                    "{tier} tier has {len} questions, expected {}",
                    bank.questions_per_tier()
                ),
            });
        }
    }

    let mut seen_ids = HashSet::new();
    for question in bank.questions() {
        if !seen_ids.insert(question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in bank.questions() {
        if question.title.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id),
                message: "title is empty".into(),
            });
        }

        if question.options.len() < 2 {
            warnings.push(ValidationWarning {
                question_id: Some(question.id),
                message: format!("only {} option(s)", question.options.len()),
            });
            continue;
        }

        let flagged = question
            .options
            .iter()
            .filter(|o| o.is_correct == Some(true))
            .count();
        if flagged > 1 {
            warnings.push(ValidationWarning {
                question_id: Some(question.id),
                message: format!("{flagged} options are flagged correct"),
            });
        }

        if flagged == 0 {
            let max = question.options.iter().map(|o| o.experience).max();
            let at_max = question
                .options
                .iter()
                .filter(|o| Some(o.experience) == max)
                .count();
            if at_max > 1 {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id),
                    message: "no option is flagged correct and the highest experience is tied; \
                              the first one counts"
                        .into(),
                });
            }
        }
    }

    warnings
}
