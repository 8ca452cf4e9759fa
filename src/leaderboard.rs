//! Leaderboard computation: a pure, full recomputation over one event's
//! questions and submissions. No incremental or cached state; any change to
//! grading or submissions means re-running the whole pass, which is fine at
//! pool scale (tens to low thousands of entries).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::matcher;
use crate::types::{LeaderboardEntry, Question, QuestionStat, Submission};

/// The derived output of one scoring pass: ranked entries plus per-question
/// aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub stats: Vec<QuestionStat>,
}

/// Score every submission against the graded questions and rank them.
///
/// Ranking order: correct answers descending, ties broken by submission
/// instant ascending (earlier entry ranks higher). Entry numbers are
/// reassigned 1..N after the sort; they are sequence positions, not stored
/// state. Unanswered questions count against the denominator; picks
/// referencing unknown questions are skipped as stale data; duplicate picks
/// for one question count once (first seen wins).
pub fn compute_leaderboard(questions: &[Question], submissions: &[Submission]) -> Leaderboard {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let total_questions = questions.len() as u32;

    let mut entries: Vec<LeaderboardEntry> = submissions
        .iter()
        .map(|submission| {
            let mut seen = HashSet::new();
            let mut correct_answers = 0u32;

            for pick in &submission.picks {
                if !seen.insert(pick.question_id.as_str()) {
                    continue;
                }
                let Some(question) = by_id.get(pick.question_id.as_str()) else {
                    continue;
                };
                if let Some(graded) = &question.correct_answer {
                    if matcher::matches(question, graded, &pick.answer) {
                        correct_answers += 1;
                    }
                }
            }

            let percentage = if total_questions > 0 {
                f64::from(correct_answers) / f64::from(total_questions) * 100.0
            } else {
                0.0
            };

            LeaderboardEntry {
                submission_id: submission.id.clone(),
                entry_number: 0,
                username: submission.username.clone(),
                first_name: submission.first_name.clone(),
                last_name: submission.last_name.clone(),
                correct_answers,
                total_questions,
                percentage,
                submitted_at: submission.submitted_at,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.correct_answers
            .cmp(&a.correct_answers)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
    });
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.entry_number = index as u32 + 1;
    }

    let stats = question_stats(questions, submissions);

    Leaderboard { entries, stats }
}

/// Per-question correctness over all submissions, for graded questions
/// only. The denominator is the total submission count, not per-submission
/// totals. Ordered most-answered-correctly first.
fn question_stats(questions: &[Question], submissions: &[Submission]) -> Vec<QuestionStat> {
    let total_submissions = submissions.len() as u32;

    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|q| q.order);

    let mut stats: Vec<QuestionStat> = ordered
        .iter()
        .enumerate()
        .filter_map(|(index, question)| {
            let graded = question.correct_answer.as_deref()?;

            let total_correct = submissions
                .iter()
                .filter(|submission| {
                    submission
                        .picks
                        .iter()
                        .find(|pick| pick.question_id == question.id)
                        .is_some_and(|pick| matcher::matches(question, graded, &pick.answer))
                })
                .count() as u32;

            let percentage = if total_submissions > 0 {
                f64::from(total_correct) / f64::from(total_submissions) * 100.0
            } else {
                0.0
            };

            Some(QuestionStat {
                question_id: question.id.clone(),
                question: question.text.clone(),
                correct_answer: question.display_answer(graded),
                total_correct,
                total_submissions,
                percentage,
                order: index as u32 + 1,
            })
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_correct
            .cmp(&a.total_correct)
            .then_with(|| b.percentage.total_cmp(&a.percentage))
    });

    stats
}
