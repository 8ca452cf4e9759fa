//! HTTP API endpoints.
//!
//! Public surface: event listing/detail, submission intake, leaderboard
//! (JSON and CSV). Admin surface (behind Basic auth in the router): event
//! and question management, grading, entry listing and edits.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::export;
use crate::leaderboard::Leaderboard;
use crate::state::{
    AppState, DomainError, NewSubmission, SubmissionEntry, UpdateSubmission,
};
use crate::types::{Event, Question, QuestionKind, Submission};

/// Error payload returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::EventNotFound
            | DomainError::QuestionNotFound
            | DomainError::SubmissionNotFound => StatusCode::NOT_FOUND,
            DomainError::EventLocked => StatusCode::CONFLICT,
            DomainError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::EntryLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            DomainError::Store(error) => {
                tracing::error!(%error, "store error while handling request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Event plus its questions, the shape a pick sheet page needs
#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub event: Event,
    pub questions: Vec<Question>,
}

/// GET /api/events — active events, most recently scheduled first
pub async fn list_events(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.active_events().await?))
}

/// GET /api/events/{id} — event detail with questions. Runs the lock
/// controller first so a view past the deadline sees the locked state.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventDetail>> {
    let event = state.event_with_lock_check(&event_id).await?;
    let questions = state.questions_for_event(&event_id).await?;
    Ok(Json(EventDetail { event, questions }))
}

/// POST /api/events/{id}/submissions — submit a pick sheet
pub async fn submit_picks(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(new): Json<NewSubmission>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let submission = state.submit_picks(&event_id, new).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/events/{id}/leaderboard — full recomputation, fresh every call
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Leaderboard>> {
    Ok(Json(state.leaderboard(&event_id).await?))
}

/// GET /api/events/{id}/leaderboard.csv — the same data as a download
pub async fn get_leaderboard_csv(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Response> {
    let leaderboard = state.leaderboard(&event_id).await?;
    let body = export::entries_csv(&leaderboard);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leaderboard.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

// ========== Admin surface ==========

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// POST /api/admin/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = state
        .create_event(request.name, request.description, request.scheduled_at)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/admin/events — all events including inactive ones
pub async fn list_all_events(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.list_events().await?))
}

#[derive(Debug, Deserialize)]
pub struct NewQuestionRequest {
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub order: u32,
}

/// POST /api/admin/events/{id}/questions
pub async fn add_question(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(request): Json<NewQuestionRequest>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    let question = state
        .add_question(&event_id, request.text, request.kind, request.order)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// PUT /api/admin/events/{id}/questions/order — body is the full id list
pub async fn reorder_questions(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(ordered_ids): Json<Vec<String>>,
) -> ApiResult<StatusCode> {
    state.reorder_questions(&event_id, &ordered_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub answer: String,
}

/// PUT /api/admin/questions/{id}/answer — record the graded answer
pub async fn grade_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
    Json(request): Json<GradeRequest>,
) -> ApiResult<Json<Question>> {
    Ok(Json(state.grade_question(&question_id, request.answer).await?))
}

/// GET /api/admin/events/{id}/entries — submissions with duplicate flags
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Vec<SubmissionEntry>>> {
    Ok(Json(state.entries_for_event(&event_id).await?))
}

/// PUT /api/admin/submissions/{id} — edit an entry
pub async fn update_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(update): Json<UpdateSubmission>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.update_submission(&submission_id, update).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (DomainError::EventNotFound, StatusCode::NOT_FOUND),
            (DomainError::EventLocked, StatusCode::CONFLICT),
            (
                DomainError::Invalid("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::EntryLimit(5), StatusCode::TOO_MANY_REQUESTS),
        ];
        for (error, expected) in cases {
            let response = ApiError(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_new_question_request_flattens_kind() {
        let request: NewQuestionRequest = serde_json::from_str(
            r#"{"text":"Total points","type":"over_under","line":49.5,"order":3}"#,
        )
        .unwrap();
        assert_eq!(request.kind, QuestionKind::OverUnder { line: 49.5 });
        assert_eq!(request.order, 3);
    }
}
