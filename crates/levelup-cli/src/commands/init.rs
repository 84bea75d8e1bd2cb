//! The `levelup init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create levelup.toml
    if std::path::Path::new("levelup.toml").exists() {
        println!("levelup.toml already exists, skipping.");
    } else {
        std::fs::write("levelup.toml", SAMPLE_CONFIG)?;
        println!("Created levelup.toml");
    }

    // Create example quiz
    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit levelup.toml (add an [api] section to sync progress)");
    println!("  2. Run: levelup validate --quiz quizzes/example.toml");
    println!("  3. Run: levelup play --quiz quizzes/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# levelup configuration

user_id = "local"
cache_dir = "./.levelup"

# Uncomment to keep progress on the quiz server as well as locally.
# [api]
# base_url = "https://quiz.example.com/api"
# token = "${LEVELUP_API_TOKEN}"
# timeout_ms = 5000

[quiz]
pass_percentage = 70
max_xp = 300

[controller]
timer_secs = 30
shuffle_options = true
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
id = "example"
name = "Example Quiz"
description = "One scenario per tier to get started"
questions_per_tier = 1

[[questions]]
id = 1
level = "basic"
title = "Unexpected attachment"
description = "A colleague you rarely talk to sends you an invoice.zip with no message."

[[questions.options]]
text = "Ask the colleague through another channel before opening it"
outcome = "They never sent it. Their account was compromised."
experience = 20
tool = "Out-of-band Check"

[[questions.options]]
text = "Open it, it's from a colleague"
outcome = "The archive installs a keylogger."
experience = -10

[[questions]]
id = 2
level = "intermediate"
title = "Password reset you didn't request"
description = "An email says your password was reset and links to a login page."

[[questions.options]]
text = "Click the link and log in to check"
outcome = "The page was a copy. Your credentials are gone."
experience = -20

[[questions.options]]
text = "Open the service directly in your browser and review account activity"
outcome = "Nothing changed. The email was a lure."
experience = 25
tool = "Bookmark Habit"

[[questions]]
id = 3
level = "advanced"
title = "Urgent wire transfer"
description = "The CFO emails from a personal address asking for an urgent transfer."

[[questions.options]]
text = "Transfer the money, it's the CFO"
outcome = "The account belonged to a fraudster."
experience = -30

[[questions.options]]
text = "Verify with the CFO by phone using the company directory"
outcome = "The CFO knew nothing about it. Fraud stopped."
experience = 30
is_correct = true
tool = "Verification Protocol"
"#;
