//! The `levelup validate` command.

use std::path::PathBuf;

use anyhow::Result;

use levelup_core::bank::{load_banks, validate_bank};
use levelup_core::model::Tier;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let banks = load_banks(&quiz_path)?;
    anyhow::ensure!(
        !banks.is_empty(),
        "no quiz banks found in {}",
        quiz_path.display()
    );

    let mut total_warnings = 0;

    for bank in &banks {
        let per_tier: Vec<String> = Tier::ALL
            .iter()
            .map(|&t| format!("{} {t}", bank.tier(t).len()))
            .collect();
        println!(
            "Quiz: {} ({} questions: {})",
            bank.name,
            bank.total_questions(),
            per_tier.join(", ")
        );

        let warnings = validate_bank(bank);
        for w in &warnings {
            let prefix = w
                .question_id
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
