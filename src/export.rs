//! CSV rendering of the derived leaderboard shapes. Consumers download
//! these; nothing here feeds back into scoring.

use crate::leaderboard::Leaderboard;

/// Render leaderboard entries as CSV, one row per entry in rank order
pub fn entries_csv(leaderboard: &Leaderboard) -> String {
    let mut out = String::from(
        "rank,username,first_name,last_name,correct_answers,total_questions,percentage,submitted_at\n",
    );
    for entry in &leaderboard.entries {
        out.push_str(&format!(
            "{},{},{},{},{},{},{:.1},{}\n",
            entry.entry_number,
            csv_field(&entry.username),
            csv_field(&entry.first_name),
            csv_field(&entry.last_name),
            entry.correct_answers,
            entry.total_questions,
            entry.percentage,
            entry.submitted_at.to_rfc3339(),
        ));
    }
    out
}

/// Render per-question stats as CSV
pub fn stats_csv(leaderboard: &Leaderboard) -> String {
    let mut out =
        String::from("order,question,correct_answer,total_correct,total_submissions,percentage\n");
    for stat in &leaderboard.stats {
        out.push_str(&format!(
            "{},{},{},{},{},{:.1}\n",
            stat.order,
            csv_field(&stat.question),
            csv_field(&stat.correct_answer),
            stat.total_correct,
            stat.total_submissions,
            stat.percentage,
        ));
    }
    out
}

/// Quote a field when it contains a delimiter, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
