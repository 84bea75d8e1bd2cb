//! The `levelup report` command.

use std::path::PathBuf;

use anyhow::Result;

use levelup_core::bank::parse_bank;
use levelup_core::model::ProgressKey;
use levelup_core::report::QuizReport;
use levelup_core::traits::ProgressGateway;
use levelup_store::create_gateway;

use super::{parse_formats, write_reports, StoreArgs};

pub async fn execute(
    quiz_path: PathBuf,
    store: StoreArgs,
    output: PathBuf,
    format: String,
) -> Result<()> {
    let formats = parse_formats(&format)?;
    let config = store.resolve()?;
    let bank = parse_bank(&quiz_path)?;
    let gateway = create_gateway(&config)?;
    let key = ProgressKey::new(config.user_id.clone(), bank.id.clone());

    let Some(snapshot) = gateway.load(&key).await else {
        anyhow::bail!("no progress stored for {key}");
    };

    let pass_percentage = config.quiz.for_bank(&bank).pass_percentage;
    let report = QuizReport::from_snapshot(&bank, config.user_id.clone(), pass_percentage, snapshot);

    println!("{}", report.to_markdown());
    for path in write_reports(&report, &output, &formats)? {
        println!("Report written to {}", path.display());
    }

    Ok(())
}
