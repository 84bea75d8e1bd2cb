//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::Result;
use std::path::Path;

use levelup_core::model::QuizStatus;
use levelup_core::report::{QuizReport, TierBreakdown};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn status_class(status: QuizStatus) -> &'static str {
    match status {
        QuizStatus::Passed | QuizStatus::Completed => "pass",
        QuizStatus::Failed => "fail",
        QuizStatus::InProgress => "pending",
    }
}

/// Generate an HTML completion report.
pub fn generate_html(report: &QuizReport) -> String {
    let snapshot = &report.snapshot;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>levelup report: {}</title>\n",
        html_escape(&report.quiz.name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.quiz.name)));
    html.push_str(&format!(
        "<p class=\"meta\">Player: <strong>{}</strong> | {} questions | {}</p>\n",
        html_escape(&report.player),
        report.quiz.question_count,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Status</th><th>Score</th><th>Pass mark</th><th>Experience</th><th>Answered</th><th>Tools</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    let tools = snapshot
        .tools
        .iter()
        .map(|t| html_escape(t))
        .collect::<Vec<_>>()
        .join(", ");
    html.push_str(&format!(
        "<tr><td class=\"{}\">{}</td><td>{}%</td><td>{}%</td><td>{}</td><td>{}/{}</td><td>{}</td></tr>\n",
        status_class(snapshot.status),
        snapshot.status,
        snapshot.score_percentage,
        report.pass_percentage,
        snapshot.experience,
        snapshot.questions_answered,
        report.quiz.question_count,
        if tools.is_empty() { "-".to_string() } else { tools },
    ));
    html.push_str("</tbody></table>\n");

    // SVG bar chart of per-tier accuracy
    html.push_str("<h2>By tier</h2>\n");
    html.push_str(&generate_bar_chart(&report.per_tier));
    html.push_str("</section>\n");

    // Answer ledger
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Answers</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Tier</th><th onclick=\"sortTable(2)\">Scenario</th><th onclick=\"sortTable(3)\">Answer</th><th onclick=\"sortTable(4)\">Result</th><th onclick=\"sortTable(5)\">Time</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for (i, record) in snapshot.question_history.iter().enumerate() {
        let (class, text) = if record.timed_out {
            ("fail", "TIMED OUT")
        } else if record.is_correct {
            ("pass", "CORRECT")
        } else {
            ("fail", "WRONG")
        };
        let time = record
            .time_spent
            .map(|s| format!("{s}s"))
            .unwrap_or_else(|| "-".to_string());

        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>\n",
            class,
            i + 1,
            record.scenario.level,
            html_escape(&record.scenario.title),
            html_escape(&record.selected_answer.text),
            class,
            text,
            time
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &QuizReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn generate_bar_chart(per_tier: &[TierBreakdown]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 140;

    let total_height = per_tier.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 120,
        total_height
    );

    for (i, tier) in per_tier.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let accuracy = tier.accuracy();
        let width = (accuracy * max_width as f64) as usize;

        let color = if accuracy >= 0.8 {
            "#22c55e"
        } else if accuracy >= 0.5 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            tier.tier
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}/{} correct</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            tier.correct,
            tier.answered
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --pending: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --pending: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.pending { background: var(--pending); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
