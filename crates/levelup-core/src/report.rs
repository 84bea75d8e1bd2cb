//! Completion report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bank::ScenarioBank;
use crate::model::{ProgressSnapshot, Tier};

/// A complete quiz report for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the quiz (without the full question bank).
    pub quiz: QuizSummary,
    /// Player the progress belongs to.
    pub player: String,
    /// Pass threshold the status was judged against.
    pub pass_percentage: u32,
    /// Progress the report was built from.
    pub snapshot: ProgressSnapshot,
    /// Answers grouped by tier, in tier order.
    pub per_tier: Vec<TierBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

/// Correctness within one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub tier: Tier,
    pub answered: usize,
    pub correct: usize,
    pub timed_out: usize,
    /// Questions the bank holds for this tier.
    pub available: usize,
}

impl TierBreakdown {
    /// Share of answered questions that were correct, `0.0..=1.0`.
    pub fn accuracy(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64
        }
    }
}

impl QuizReport {
    /// Build a report from stored progress against `bank`.
    pub fn from_snapshot(
        bank: &ScenarioBank,
        player: impl Into<String>,
        pass_percentage: u32,
        snapshot: ProgressSnapshot,
    ) -> Self {
        let per_tier = Tier::ALL
            .iter()
            .map(|&tier| {
                let records = snapshot
                    .question_history
                    .iter()
                    .filter(|r| r.scenario.level == tier);
                let (mut answered, mut correct, mut timed_out) = (0, 0, 0);
                for record in records {
                    answered += 1;
                    correct += usize::from(record.is_correct);
                    timed_out += usize::from(record.timed_out);
                }
                TierBreakdown {
                    tier,
                    answered,
                    correct,
                    timed_out,
                    available: bank.tier(tier).len(),
                }
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            quiz: QuizSummary {
                id: bank.id.clone(),
                name: bank.name.clone(),
                question_count: bank.total_questions(),
            },
            player: player.into(),
            pass_percentage,
            snapshot,
            per_tier,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: QuizReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let snapshot = &self.snapshot;

        md.push_str(&format!("## {} ({})\n\n", self.quiz.name, self.player));
        md.push_str(&format!(
            "**Status:** {} | **Score:** {}% (pass {}%) | **Experience:** {} | **Answered:** {}/{}\n\n",
            snapshot.status,
            snapshot.score_percentage,
            self.pass_percentage,
            snapshot.experience,
            snapshot.questions_answered,
            self.quiz.question_count
        ));

        md.push_str("| Tier | Answered | Correct | Timed out |\n");
        md.push_str("|------|----------|---------|-----------|\n");
        for t in &self.per_tier {
            md.push_str(&format!(
                "| {} | {}/{} | {} | {} |\n",
                t.tier, t.answered, t.available, t.correct, t.timed_out
            ));
        }

        if !snapshot.tools.is_empty() {
            md.push_str("\n**Tools:** ");
            md.push_str(&snapshot.tools.iter().cloned().collect::<Vec<_>>().join(", "));
            md.push('\n');
        }

        md
    }
}
