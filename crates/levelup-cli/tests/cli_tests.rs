//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn levelup(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("levelup").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("LEVELUP_API_URL")
        .env_remove("LEVELUP_API_TOKEN")
        .env_remove("LEVELUP_USER");
    cmd
}

/// A 15-question bank where option 1 is always right and option 2 always wrong.
fn write_bank(dir: &Path) -> PathBuf {
    let mut toml = String::from(
        r#"[quiz]
id = "cli-test"
name = "CLI Test Quiz"
"#,
    );
    let levels = ["basic", "intermediate", "advanced"];
    for i in 0..15 {
        toml.push_str(&format!(
            r#"
[[questions]]
id = {id}
level = "{level}"
title = "Scenario {id}"

[[questions.options]]
text = "Right"
outcome = "Well done."
experience = 20
tool = "Tool {id}"

[[questions.options]]
text = "Wrong"
outcome = "That hurt."
experience = 0
"#,
            id = i + 1,
            level = levels[i / 5]
        ));
    }
    let path = dir.join("bank.toml");
    std::fs::write(&path, toml).unwrap();
    path
}

fn play(dir: &Path, bank: &Path, answers: &str) -> assert_cmd::assert::Assert {
    levelup(dir)
        .arg("play")
        .arg("--quiz")
        .arg(bank)
        .args(["--user", "alice", "--cache-dir", "cache"])
        .args(["--timer-secs", "0", "--no-shuffle"])
        .write_stdin(answers.to_string())
        .assert()
}

#[test]
fn validate_shipped_quiz() {
    let dir = TempDir::new().unwrap();
    levelup(dir.path())
        .arg("validate")
        .arg("--quiz")
        .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../quizzes/phishing-awareness.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("15 questions"))
        .stdout(predicate::str::contains("5 basic, 5 intermediate, 5 advanced"))
        .stdout(predicate::str::contains("All quizzes valid"));
}

#[test]
fn validate_directory() {
    let dir = TempDir::new().unwrap();
    levelup(dir.path())
        .arg("validate")
        .arg("--quiz")
        .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../quizzes"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Phishing Awareness"))
        .stdout(predicate::str::contains("Password Security"));
}

#[test]
fn validate_reports_short_tier() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.toml");
    std::fs::write(
        &path,
        r#"[quiz]
id = "short"
name = "Short"

[[questions]]
id = 1
level = "basic"
title = "Only one"

[[questions.options]]
text = "A"
experience = 10

[[questions.options]]
text = "B"
experience = 0
"#,
    )
    .unwrap();

    levelup(dir.path())
        .arg("validate")
        .arg("--quiz")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("basic tier has 1 questions, expected 5"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    levelup(dir.path())
        .arg("validate")
        .arg("--quiz")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    levelup(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created levelup.toml"))
        .stdout(predicate::str::contains("Created quizzes/example.toml"));

    assert!(dir.path().join("levelup.toml").exists());
    assert!(dir.path().join("quizzes/example.toml").exists());

    levelup(dir.path())
        .arg("validate")
        .arg("--quiz")
        .arg("quizzes/example.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("All quizzes valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    levelup(dir.path()).arg("init").assert().success();

    levelup(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn play_full_quiz_and_pass() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    play(dir.path(), &bank, &"1\n".repeat(15))
        .success()
        .stdout(predicate::str::contains("[basic] Question 1/15: Scenario 1"))
        .stdout(predicate::str::contains("Level up! Entering the intermediate tier"))
        .stdout(predicate::str::contains("Level up! Entering the advanced tier"))
        .stdout(predicate::str::contains("Quiz passed! Score: 100% | Experience: 300"))
        .stdout(predicate::str::contains("You earned: Tool 15"));
}

#[test]
fn play_full_quiz_and_fail() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    play(dir.path(), &bank, &"2\n".repeat(15))
        .success()
        .stdout(predicate::str::contains("Not quite."))
        .stdout(predicate::str::contains("Quiz failed! Score: 0%"));
}

#[test]
fn play_rejects_bad_input_and_continues() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    play(dir.path(), &bank, "abc\n7\n1\n")
        .success()
        .stdout(predicate::str::contains("Enter an option number"))
        .stdout(predicate::str::contains("Please try again"))
        .stdout(predicate::str::contains("Progress saved (1 answered)"));
}

#[test]
fn play_resumes_saved_progress() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    play(dir.path(), &bank, "1\n1\n1\n")
        .success()
        .stdout(predicate::str::contains("Progress saved (3 answered)"));

    assert!(dir
        .path()
        .join("cache/quiz_progress_alice_cli-test.json")
        .exists());

    levelup(dir.path())
        .arg("progress")
        .arg("--quizzes")
        .arg(&bank)
        .args(["--user", "alice", "--cache-dir", "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3/15"))
        .stdout(predicate::str::contains("in-progress"))
        .stdout(predicate::str::contains("20%"));

    play(dir.path(), &bank, &"1\n".repeat(12))
        .success()
        .stdout(predicate::str::contains("Resuming at question 4."))
        .stdout(predicate::str::contains("[advanced] Question 15/15"))
        .stdout(predicate::str::contains("Quiz passed!"));

    play(dir.path(), &bank, "")
        .success()
        .stdout(predicate::str::contains(
            "Your last attempt passed. Starting a new attempt.",
        ))
        .stdout(predicate::str::contains("Question 1/15"));
}

#[test]
fn quit_keeps_progress() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    play(dir.path(), &bank, "1\nq\n1\n1\n")
        .success()
        .stdout(predicate::str::contains("Progress saved (1 answered)"));
}

#[test]
fn reset_removes_progress() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());
    play(dir.path(), &bank, "1\n1\n").success();

    levelup(dir.path())
        .arg("reset")
        .args(["--quiz-id", "cli-test", "--user", "alice", "--cache-dir", "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed local progress for alice/cli-test"));

    levelup(dir.path())
        .arg("progress")
        .arg("--quizzes")
        .arg(&bank)
        .args(["--user", "alice", "--cache-dir", "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not started"));

    levelup(dir.path())
        .arg("reset")
        .args(["--quiz-id", "cli-test", "--user", "alice", "--cache-dir", "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No local progress stored"));
}

#[test]
fn report_after_play() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());
    play(dir.path(), &bank, &"1\n".repeat(11)).success();
    play(dir.path(), &bank, &"2\n".repeat(4))
        .success()
        .stdout(predicate::str::contains("Quiz passed! Score: 73%"));

    levelup(dir.path())
        .arg("report")
        .arg("--quiz")
        .arg(&bank)
        .args(["--user", "alice", "--cache-dir", "cache"])
        .args(["--output", "out", "--format", "json,html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**Status:** passed"))
        .stdout(predicate::str::contains("| advanced | 5/5 | 1 | 0 |"));

    let json = std::fs::read_to_string(dir.path().join("out/cli-test-alice.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["snapshot"]["scorePercentage"], 73);
    assert!(dir.path().join("out/cli-test-alice.html").exists());
}

#[test]
fn play_writes_report_on_completion() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    levelup(dir.path())
        .arg("play")
        .arg("--quiz")
        .arg(&bank)
        .args(["--user", "bob", "--cache-dir", "cache"])
        .args(["--timer-secs", "0", "--no-shuffle"])
        .args(["--report-dir", "reports", "--format", "html"])
        .write_stdin("2\n".repeat(15))
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    assert!(dir.path().join("reports/cli-test-bob.html").exists());
    assert!(!dir.path().join("reports/cli-test-bob.json").exists());
}

#[test]
fn report_without_progress_fails() {
    let dir = TempDir::new().unwrap();
    let bank = write_bank(dir.path());

    levelup(dir.path())
        .arg("report")
        .arg("--quiz")
        .arg(&bank)
        .args(["--user", "nobody", "--cache-dir", "cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no progress stored for nobody/cli-test"));
}

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();
    levelup(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tiered multiple-choice training quizzes"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();
    levelup(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("levelup"));
}
