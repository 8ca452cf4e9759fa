use chrono::Utc;

use super::{AppState, DomainError, DomainResult};
use crate::store::EventStore;
use crate::types::{Question, QuestionKind};

impl AppState {
    /// Add a question to an event. The display order must be unique within
    /// the event.
    pub async fn add_question(
        &self,
        event_id: &str,
        text: String,
        kind: QuestionKind,
        order: u32,
    ) -> DomainResult<Question> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::Invalid("question text is required".to_string()));
        }
        validate_kind(&kind)?;

        if self.store.get_event(event_id).await?.is_none() {
            return Err(DomainError::EventNotFound);
        }
        let existing = self.store.questions_for_event(event_id).await?;
        if existing.iter().any(|q| q.order == order) {
            return Err(DomainError::Invalid(format!(
                "display order {} is already taken",
                order
            )));
        }

        let question = Question {
            id: ulid::Ulid::new().to_string(),
            event_id: event_id.to_string(),
            text,
            kind,
            correct_answer: None,
            order,
            created_at: Utc::now(),
        };
        self.store.insert_question(question.clone()).await?;
        Ok(question)
    }

    /// Questions of an event in display order
    pub async fn questions_for_event(&self, event_id: &str) -> DomainResult<Vec<Question>> {
        if self.store.get_event(event_id).await?.is_none() {
            return Err(DomainError::EventNotFound);
        }
        Ok(self.store.questions_for_event(event_id).await?)
    }

    /// Reorder an event's questions. `ordered_ids` must name every question
    /// of the event exactly once; positions become 1..N.
    pub async fn reorder_questions(
        &self,
        event_id: &str,
        ordered_ids: &[String],
    ) -> DomainResult<()> {
        let questions = self.questions_for_event(event_id).await?;
        if ordered_ids.len() != questions.len() {
            return Err(DomainError::Invalid(format!(
                "expected {} question ids, got {}",
                questions.len(),
                ordered_ids.len()
            )));
        }
        for (index, id) in ordered_ids.iter().enumerate() {
            if !questions.iter().any(|q| &q.id == id) {
                return Err(DomainError::Invalid(format!(
                    "question {} does not belong to this event",
                    id
                )));
            }
            if ordered_ids[..index].contains(id) {
                return Err(DomainError::Invalid(format!(
                    "question {} listed more than once",
                    id
                )));
            }
        }

        for (index, id) in ordered_ids.iter().enumerate() {
            self.store
                .set_question_order(id, index as u32 + 1)
                .await?;
        }
        Ok(())
    }

    /// Record the graded answer for a question (the grading workflow's
    /// single-field write). The answer must be well-formed for the
    /// question's kind; a leaderboard recomputation picks it up on the next
    /// request.
    pub async fn grade_question(&self, question_id: &str, answer: String) -> DomainResult<Question> {
        let question = self
            .store
            .get_question(question_id)
            .await?
            .ok_or(DomainError::QuestionNotFound)?;

        let answer = answer.trim().to_string();
        if !question.kind.accepts(&answer) {
            return Err(DomainError::Invalid(format!(
                "\"{}\" is not a valid answer for this question",
                answer
            )));
        }

        self.store
            .set_correct_answer(question_id, answer.clone())
            .await?;
        tracing::info!(question_id, answer = %answer, "question graded");

        let mut question = question;
        question.correct_answer = Some(answer);
        Ok(question)
    }
}

fn validate_kind(kind: &QuestionKind) -> DomainResult<()> {
    match kind {
        QuestionKind::MultipleChoice { options } => {
            if options.len() < 2 {
                return Err(DomainError::Invalid(
                    "multiple choice questions need at least two options".to_string(),
                ));
            }
            for (index, option) in options.iter().enumerate() {
                if option.id.trim().is_empty() || option.text.trim().is_empty() {
                    return Err(DomainError::Invalid(format!(
                        "option {} needs an id and text",
                        index + 1
                    )));
                }
                if options[..index].iter().any(|other| other.id == option.id) {
                    return Err(DomainError::Invalid(format!(
                        "duplicate option id \"{}\"",
                        option.id
                    )));
                }
            }
            Ok(())
        }
        QuestionKind::OverUnder { line } => {
            if !line.is_finite() {
                return Err(DomainError::Invalid(
                    "over/under line must be a finite number".to_string(),
                ));
            }
            Ok(())
        }
        QuestionKind::YesNo { .. } | QuestionKind::Text { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use crate::types::ChoiceOption;
    use std::sync::Arc;

    async fn state_with_event() -> (AppState, String) {
        let state = AppState::new(Arc::new(MemStore::new()));
        let event = state
            .create_event("Test".to_string(), String::new(), None)
            .await
            .unwrap();
        (state, event.id)
    }

    fn choice_kind() -> QuestionKind {
        QuestionKind::MultipleChoice {
            options: vec![
                ChoiceOption {
                    id: "a".to_string(),
                    text: "Team A".to_string(),
                },
                ChoiceOption {
                    id: "b".to_string(),
                    text: "Team B".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_add_question_rejects_duplicate_order() {
        let (state, event_id) = state_with_event().await;
        state
            .add_question(&event_id, "First".to_string(), choice_kind(), 1)
            .await
            .unwrap();
        let result = state
            .add_question(&event_id, "Second".to_string(), choice_kind(), 1)
            .await;
        assert!(matches!(result, Err(DomainError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_add_question_validates_options() {
        let (state, event_id) = state_with_event().await;
        let one_option = QuestionKind::MultipleChoice {
            options: vec![ChoiceOption {
                id: "a".to_string(),
                text: "Only".to_string(),
            }],
        };
        let result = state
            .add_question(&event_id, "Bad".to_string(), one_option, 1)
            .await;
        assert!(matches!(result, Err(DomainError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_grade_question_validates_answer_shape() {
        let (state, event_id) = state_with_event().await;
        let question = state
            .add_question(
                &event_id,
                "Total points".to_string(),
                QuestionKind::OverUnder { line: 49.5 },
                1,
            )
            .await
            .unwrap();

        let result = state
            .grade_question(&question.id, "push".to_string())
            .await;
        assert!(matches!(result, Err(DomainError::Invalid(_))));

        let graded = state
            .grade_question(&question.id, "over".to_string())
            .await
            .unwrap();
        assert_eq!(graded.correct_answer.as_deref(), Some("over"));

        // Persisted via the single-field write
        let stored = state.store.get_question(&question.id).await.unwrap().unwrap();
        assert_eq!(stored.correct_answer.as_deref(), Some("over"));
    }

    #[tokio::test]
    async fn test_grade_choice_question_requires_option_id() {
        let (state, event_id) = state_with_event().await;
        let question = state
            .add_question(&event_id, "Winner".to_string(), choice_kind(), 1)
            .await
            .unwrap();

        assert!(state
            .grade_question(&question.id, "Team A".to_string())
            .await
            .is_err());
        assert!(state
            .grade_question(&question.id, "a".to_string())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_reorder_questions() {
        let (state, event_id) = state_with_event().await;
        let q1 = state
            .add_question(&event_id, "One".to_string(), choice_kind(), 1)
            .await
            .unwrap();
        let q2 = state
            .add_question(&event_id, "Two".to_string(), choice_kind(), 2)
            .await
            .unwrap();

        state
            .reorder_questions(&event_id, &[q2.id.clone(), q1.id.clone()])
            .await
            .unwrap();

        let questions = state.questions_for_event(&event_id).await.unwrap();
        assert_eq!(questions[0].id, q2.id);
        assert_eq!(questions[1].id, q1.id);
    }

    #[tokio::test]
    async fn test_reorder_rejects_foreign_question() {
        let (state, event_id) = state_with_event().await;
        state
            .add_question(&event_id, "One".to_string(), choice_kind(), 1)
            .await
            .unwrap();

        let result = state
            .reorder_questions(&event_id, &["not-ours".to_string()])
            .await;
        assert!(matches!(result, Err(DomainError::Invalid(_))));
    }
}
