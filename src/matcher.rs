//! Answer matching: exact equality for closed-form question kinds, tokenized
//! fuzzy matching for free text.

use crate::types::{Question, QuestionKind};

/// Decide whether a submitted answer matches the graded answer for a
/// question. Closed-form kinds (choice, over/under, yes/no) compare the raw
/// strings; their answer spaces are already canonical identifiers, so no
/// normalization is applied. Free text goes through the fuzzy matcher.
pub fn matches(question: &Question, graded_answer: &str, candidate_answer: &str) -> bool {
    match &question.kind {
        QuestionKind::Text { accepted_answers } => {
            text_answer_matches(graded_answer, accepted_answers, candidate_answer)
        }
        _ => !candidate_answer.is_empty() && graded_answer == candidate_answer,
    }
}

/// Flexible free-text matching against the graded answer plus any accepted
/// aliases. A single matching candidate suffices.
pub fn text_answer_matches(graded_answer: &str, accepted: &[String], submitted: &str) -> bool {
    if submitted.is_empty() {
        return false;
    }
    std::iter::once(graded_answer)
        .chain(accepted.iter().map(String::as_str))
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| basic_text_match(candidate, submitted))
}

/// Case-insensitive trimmed equality, then a token containment check in
/// either direction: every word of one side must appear as a substring of
/// the other. Tolerates phrasing differences ("49ers" vs "San Francisco
/// 49ers") but is intentionally permissive; short or common tokens can
/// produce false positives, an accepted tradeoff of this heuristic.
fn basic_text_match(expected: &str, actual: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    let actual = actual.trim().to_lowercase();
    if expected.is_empty() || actual.is_empty() {
        return false;
    }
    if expected == actual {
        return true;
    }

    let expected_words: Vec<&str> = expected.split_whitespace().collect();
    let actual_words: Vec<&str> = actual.split_whitespace().collect();

    expected_words.iter().all(|word| actual.contains(word))
        || actual_words.iter().all(|word| expected.contains(word))
}
