//! The `levelup progress` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

use levelup_core::bank::load_banks;
use levelup_core::model::{ProgressKey, QuizStatus};
use levelup_core::traits::ProgressGateway;
use levelup_store::create_gateway;

use super::StoreArgs;

pub async fn execute(quizzes: PathBuf, store: StoreArgs) -> Result<()> {
    let config = store.resolve()?;
    let gateway = create_gateway(&config)?;
    let banks = load_banks(&quizzes)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Quiz", "Status", "Answered", "Score", "XP", "Tools", "Updated",
    ]);

    for bank in &banks {
        let key = ProgressKey::new(config.user_id.clone(), bank.id.clone());
        match gateway.load(&key).await {
            Some(snapshot) => {
                let color = match snapshot.status {
                    QuizStatus::Passed | QuizStatus::Completed => Color::Green,
                    QuizStatus::Failed => Color::Red,
                    QuizStatus::InProgress => Color::Yellow,
                };
                table.add_row(vec![
                    Cell::new(&bank.name),
                    Cell::new(snapshot.status).fg(color),
                    Cell::new(format!(
                        "{}/{}",
                        snapshot.questions_answered,
                        bank.total_questions()
                    )),
                    Cell::new(format!("{}%", snapshot.score_percentage)),
                    Cell::new(snapshot.experience),
                    Cell::new(snapshot.tools.len()),
                    Cell::new(snapshot.last_updated.format("%Y-%m-%d %H:%M")),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(&bank.name),
                    Cell::new("not started"),
                    Cell::new(format!("0/{}", bank.total_questions())),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }

    println!("Progress for {}:", config.user_id);
    println!("{table}");
    Ok(())
}
