//! Subcommand implementations and the options they share.

pub mod init;
pub mod play;
pub mod progress;
pub mod report;
pub mod reset;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use levelup_core::report::QuizReport;
use levelup_report::html::write_html_report;
use levelup_store::{load_config_from, LevelupConfig};

/// Options selecting whose progress is used and where it lives.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Player identity (overrides config)
    #[arg(long)]
    pub user: Option<String>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Local progress cache directory (overrides config)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

impl StoreArgs {
    /// Load the config file and apply command-line overrides.
    pub fn resolve(&self) -> Result<LevelupConfig> {
        let mut config = load_config_from(self.config.as_deref())?;
        if let Some(user) = &self.user {
            anyhow::ensure!(!user.trim().is_empty(), "--user must not be empty");
            config.user_id = user.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Report formats requested by a comma-separated `--format` value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Formats {
    pub json: bool,
    pub html: bool,
}

pub fn parse_formats(format: &str) -> Result<Formats> {
    let mut formats = Formats::default();
    for f in format.split(',').map(|s| s.trim()) {
        match f {
            "json" => formats.json = true,
            "html" => formats.html = true,
            "all" => {
                formats.json = true;
                formats.html = true;
            }
            other => anyhow::bail!("unknown report format: '{other}' (expected json, html, all)"),
        }
    }
    Ok(formats)
}

/// Write `report` to `dir` in each requested format.
pub fn write_reports(report: &QuizReport, dir: &Path, formats: &Formats) -> Result<Vec<PathBuf>> {
    let stem = format!("{}-{}", report.quiz.id, report.player);
    let mut written = Vec::new();

    if formats.json {
        let path = dir.join(format!("{stem}.json"));
        report.save_json(&path)?;
        written.push(path);
    }
    if formats.html {
        let path = dir.join(format!("{stem}.html"));
        write_html_report(report, &path)?;
        written.push(path);
    }

    Ok(written)
}
