//! levelup CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::StoreArgs;

#[derive(Parser)]
#[command(name = "levelup", version, about = "Tiered multiple-choice training quizzes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a quiz in the terminal
    Play {
        /// Path to the quiz bank .toml
        #[arg(long)]
        quiz: PathBuf,

        #[command(flatten)]
        store: StoreArgs,

        /// Seconds per question (0 disables the countdown)
        #[arg(long)]
        timer_secs: Option<u64>,

        /// Show options in declaration order
        #[arg(long)]
        no_shuffle: bool,

        /// Write a completion report to this directory when the quiz ends
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Report format: json, html, all
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Validate quiz bank TOML files
    Validate {
        /// Path to quiz bank file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Show stored progress for quizzes
    Progress {
        /// Path to quiz bank file or directory
        #[arg(long)]
        quizzes: PathBuf,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Remove local progress for a quiz
    Reset {
        /// Quiz identifier
        #[arg(long)]
        quiz_id: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Build a report from stored progress
    Report {
        /// Path to the quiz bank .toml
        #[arg(long)]
        quiz: PathBuf,

        #[command(flatten)]
        store: StoreArgs,

        /// Output directory
        #[arg(long, default_value = "./levelup-reports")]
        output: PathBuf,

        /// Output format: json, html, all
        #[arg(long, default_value = "json,html")]
        format: String,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "levelup=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            quiz,
            store,
            timer_secs,
            no_shuffle,
            report_dir,
            format,
        } => commands::play::execute(quiz, store, timer_secs, no_shuffle, report_dir, format).await,
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Progress { quizzes, store } => commands::progress::execute(quizzes, store).await,
        Commands::Reset { quiz_id, store } => commands::reset::execute(quiz_id, store).await,
        Commands::Report {
            quiz,
            store,
            output,
            format,
        } => commands::report::execute(quiz, store, output, format).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
