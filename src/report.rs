//! Human-readable rendering of a [`BatchReport`].

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::engine::BatchReport;

const RULE_WIDTH: usize = 28;

pub fn title(report: &BatchReport) -> String {
    format!(
        "{} check-in: {}/{} succeeded",
        report.service,
        report.succeeded(),
        report.len()
    )
}

/// Render the notification body. Every account gets exactly one block.
pub fn render(report: &BatchReport, generated_at: NaiveDateTime) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "🎯 {} check-in report", report.service);
    let _ = writeln!(out, "{rule}");

    for (index, result) in report.results.iter().enumerate() {
        let mark = if result.success { "✅" } else { "❌" };
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {} {}", index + 1, mark, result.label);
        let _ = writeln!(out, "   Status: {}", result.message);
        for field in &result.fields {
            let _ = writeln!(out, "   {}: {}", field.label, field.value);
        }
        for note in &result.notes {
            let _ = writeln!(out, "   Note: {note}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    let _ = write!(out, "🕐 {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    out
}
