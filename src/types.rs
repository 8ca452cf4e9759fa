use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type EventId = String;
pub type QuestionId = String;
pub type SubmissionId = String;

/// A prediction-pool event. Participants submit pick sheets until the event
/// locks at its scheduled start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: String,
    /// Scheduled start instant. `None` means the schedule is malformed;
    /// such an event never auto-locks.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Visible to participants
    pub is_active: bool,
    /// Accepts no further submissions. Monotone: the lock controller only
    /// ever sets this to true; clearing it is an admin override elsewhere.
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

/// One selectable option of a closed-set choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

/// Custom display labels for a binary question (e.g. "Heads"/"Tails")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryLabels {
    pub yes: String,
    pub no: String,
}

/// The four prop question kinds. The pick answer is an opaque string whose
/// interpretation depends on the kind: an option id, the literal
/// "over"/"under", the literal "yes"/"no", or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<ChoiceOption>,
    },
    OverUnder {
        line: f64,
    },
    YesNo {
        labels: Option<BinaryLabels>,
    },
    Text {
        /// Alternative graded answers also counted as correct
        #[serde(default)]
        accepted_answers: Vec<String>,
    },
}

impl QuestionKind {
    /// Whether an answer string is well-formed for this kind. Used at
    /// submission intake and when grading.
    pub fn accepts(&self, answer: &str) -> bool {
        match self {
            QuestionKind::MultipleChoice { options } => options.iter().any(|o| o.id == answer),
            QuestionKind::OverUnder { .. } => matches!(answer, "over" | "under"),
            QuestionKind::YesNo { .. } => matches!(answer, "yes" | "no"),
            QuestionKind::Text { .. } => !answer.trim().is_empty(),
        }
    }
}

/// A prop question belonging to exactly one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub event_id: EventId,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// The organizer-recorded correct answer. Absence means "ungraded",
    /// never "incorrect".
    pub correct_answer: Option<String>,
    /// Display order, unique within the event
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Render an answer string for display (option text, custom binary
    /// labels, "Over 49.5", or the free text itself)
    pub fn display_answer(&self, answer: &str) -> String {
        match &self.kind {
            QuestionKind::MultipleChoice { options } => options
                .iter()
                .find(|o| o.id == answer)
                .map(|o| o.text.clone())
                .unwrap_or_else(|| answer.to_string()),
            QuestionKind::OverUnder { line } => match answer {
                "over" => format!("Over {}", line),
                "under" => format!("Under {}", line),
                _ => answer.to_string(),
            },
            QuestionKind::YesNo { labels } => match (answer, labels) {
                ("yes", Some(l)) => l.yes.clone(),
                ("no", Some(l)) => l.no.clone(),
                ("yes", None) => "Yes".to_string(),
                ("no", None) => "No".to_string(),
                _ => answer.to_string(),
            },
            QuestionKind::Text { .. } => answer.to_string(),
        }
    }
}

/// One participant's answer to one question within a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub question_id: QuestionId,
    pub answer: String,
}

/// A participant's full pick sheet for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub event_id: EventId,
    /// Participant-chosen handle, lowercased at intake
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub picks: Vec<Pick>,
    pub submitted_at: DateTime<Utc>,
}

/// One row of the computed leaderboard. Derived, never persisted;
/// recomputed in full on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub submission_id: SubmissionId,
    /// Rank, reassigned 1..N after the final sort
    pub entry_number: u32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Per-question correctness aggregate, computed in the same pass as the
/// leaderboard. Only graded questions produce a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStat {
    pub question_id: QuestionId,
    pub question: String,
    /// Display-formatted graded answer
    pub correct_answer: String,
    pub total_correct: u32,
    pub total_submissions: u32,
    pub percentage: f64,
    /// 1-based display position within the event
    pub order: u32,
}
