//! The `levelup play` command.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use levelup_core::bank::{parse_bank, validate_bank};
use levelup_core::controller::{Presentation, QuizController};
use levelup_core::engine::ProgressionEngine;
use levelup_core::error::QuizError;
use levelup_core::model::{
    AnswerRecord, PresentedOption, ProgressKey, ProgressSnapshot, Question, QuizStatus, Tier,
};
use levelup_core::report::QuizReport;
use levelup_core::traits::{ProgressGateway, QuizRenderer};
use levelup_store::create_gateway;

use super::{parse_formats, write_reports, StoreArgs};

/// Things the input loop must react to that happen off its own path.
enum ConsoleEvent {
    /// The countdown expired and an answer was recorded for the player.
    TimedOut,
}

/// Terminal renderer.
struct ConsoleRenderer {
    total: usize,
    answered: AtomicUsize,
    events: mpsc::UnboundedSender<ConsoleEvent>,
}

impl ConsoleRenderer {
    fn new(total: usize, events: mpsc::UnboundedSender<ConsoleEvent>) -> Self {
        Self {
            total,
            answered: AtomicUsize::new(0),
            events,
        }
    }

    fn set_answered(&self, answered: usize) {
        self.answered.store(answered, Ordering::Relaxed);
    }
}

impl QuizRenderer for ConsoleRenderer {
    fn render_question(&self, question: &Question, options: &[PresentedOption]) {
        println!(
            "\n[{}] Question {}/{}: {}",
            question.level,
            self.answered.load(Ordering::Relaxed) + 1,
            self.total,
            question.title
        );
        if !question.description.is_empty() {
            println!("  {}", question.description);
        }
        for (i, presented) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, presented.option.text);
        }
        println!("Your answer (1-{}, q to quit):", options.len());
    }

    fn render_outcome(&self, record: &AnswerRecord) {
        self.answered.fetch_add(1, Ordering::Relaxed);

        if record.timed_out {
            println!("Time's up! No experience for this one.");
        } else if record.is_correct {
            println!("Correct! {:+} XP", record.selected_answer.experience);
        } else {
            println!("Not quite. {:+} XP", record.selected_answer.experience);
        }
        if !record.selected_answer.outcome.is_empty() {
            println!("  {}", record.selected_answer.outcome);
        }
        if let (false, Some(tool)) = (record.timed_out, &record.selected_answer.tool) {
            println!("  You earned: {tool}");
        }

        if record.timed_out {
            let _ = self.events.send(ConsoleEvent::TimedOut);
        }
    }

    fn render_completion(&self, snapshot: &ProgressSnapshot) {
        let verdict = match snapshot.status {
            QuizStatus::Passed | QuizStatus::Completed => "passed",
            QuizStatus::Failed => "failed",
            QuizStatus::InProgress => "paused",
        };
        println!(
            "\nQuiz {verdict}! Score: {}% | Experience: {} | Answered: {}/{}",
            snapshot.score_percentage, snapshot.experience, snapshot.questions_answered, self.total
        );
        if !snapshot.tools.is_empty() {
            let tools: Vec<&str> = snapshot.tools.iter().map(String::as_str).collect();
            println!("Tools collected: {}", tools.join(", "));
        }
    }

    fn render_level_transition(&self, tier: Tier) {
        println!("\n*** Level up! Entering the {tier} tier ***");
    }

    fn render_notice(&self, message: &str) {
        println!("! {message}");
    }
}

pub async fn execute(
    quiz_path: PathBuf,
    store: StoreArgs,
    timer_secs: Option<u64>,
    no_shuffle: bool,
    report_dir: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let formats = parse_formats(&format)?;
    let mut config = store.resolve()?;
    if let Some(secs) = timer_secs {
        config.controller.timer_secs = secs;
    }
    if no_shuffle {
        config.controller.shuffle_options = false;
    }

    let bank = Arc::new(parse_bank(&quiz_path)?);
    anyhow::ensure!(
        bank.total_questions() > 0,
        "quiz '{}' has no questions",
        bank.id
    );
    for w in validate_bank(&bank) {
        tracing::warn!(quiz = %bank.id, question = ?w.question_id, "{}", w.message);
    }

    let gateway: Arc<dyn ProgressGateway> = Arc::new(create_gateway(&config)?);
    let quiz_config = config.quiz.for_bank(&bank);
    let pass_percentage = quiz_config.pass_percentage;
    let key = ProgressKey::new(config.user_id.clone(), bank.id.clone());
    let engine = ProgressionEngine::new(Arc::clone(&bank), quiz_config, gateway, key)
        .with_player_name(config.user_id.clone());

    let (tx, mut events) = mpsc::unbounded_channel();
    let renderer = Arc::new(ConsoleRenderer::new(bank.total_questions(), tx));
    let controller = QuizController::new(engine, renderer.clone(), config.controller.clone());

    println!("{}", bank.name);
    if !bank.description.is_empty() {
        println!("{}", bank.description);
    }

    let start = controller.start().await;
    if let Some(previous) = start.previous_status {
        println!("Your last attempt {previous}. Starting a new attempt.");
    } else if start.resumed_at > 0 {
        println!("Resuming at question {}.", start.resumed_at + 1);
    }
    renderer.set_answered(start.resumed_at);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut presentation = controller.present_next().await?;

    loop {
        match &presentation {
            Presentation::Finished(_) => break,
            Presentation::Question {
                remaining: Some(remaining),
                ..
            } => println!("({}s on the clock)", remaining.as_secs()),
            Presentation::Question { .. } => {}
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read answer")? else {
                    return pause(&controller).await;
                };
                let input = line.trim();
                if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
                    return pause(&controller).await;
                }
                let Some(choice) = input.parse::<usize>().ok().filter(|n| *n >= 1) else {
                    println!("Enter an option number, or q to quit.");
                    continue;
                };

                match controller.submit_answer(choice - 1).await {
                    Ok(outcome) if outcome.finished.is_some() => break,
                    Ok(_) | Err(QuizError::NoActiveQuestion) => {
                        presentation = controller.present_next().await?;
                    }
                    // The controller already told the player to retry.
                    Err(QuizError::InvalidOption { .. }) => {}
                    Err(e) => println!("! {e}"),
                }
            }
            Some(ConsoleEvent::TimedOut) = events.recv() => {
                if controller.state().await.is_terminal() {
                    break;
                }
                presentation = controller.present_next().await?;
            }
            _ = tokio::signal::ctrl_c() => {
                return pause(&controller).await;
            }
        }
    }

    if let Some(dir) = report_dir {
        let report = QuizReport::from_snapshot(
            &bank,
            config.user_id.clone(),
            pass_percentage,
            controller.snapshot().await,
        );
        for path in write_reports(&report, &dir, &formats)? {
            println!("Report written to {}", path.display());
        }
    }

    Ok(())
}

/// Leave mid-quiz, keeping progress and the countdown.
async fn pause(controller: &QuizController) -> Result<()> {
    controller.teardown().await;
    let snapshot = controller.snapshot().await;
    println!(
        "\nProgress saved ({} answered). Run the same command to resume.",
        snapshot.questions_answered
    );
    Ok(())
}
