use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthSession, require_admin};
use crate::error::{AppError, AppResult};
use crate::models::{Poll, Vote};
use crate::results::{ResultSummary, compute_results, is_poll_active};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub selected_option: String,
}

#[derive(Debug, Serialize)]
pub struct PollSummary {
    #[serde(flatten)]
    pub poll: Poll,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct OptionResult {
    pub label: String,
    pub count: u64,
    /// Unrounded share of the total; clients round for display.
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ResultsPayload {
    pub total_votes: u64,
    pub options: Vec<OptionResult>,
}

#[derive(Debug, Serialize)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: Poll,
    pub active: bool,
    pub results: ResultsPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_vote: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub vote: Vote,
    pub results: ResultsPayload,
}

fn results_payload(summary: &ResultSummary) -> ResultsPayload {
    ResultsPayload {
        total_votes: summary.total_votes(),
        options: summary
            .iter()
            .map(|(label, count)| OptionResult {
                percentage: summary.percentage(label),
                label: label.to_string(),
                count,
            })
            .collect(),
    }
}

pub async fn create_poll(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<(StatusCode, Json<Poll>)> {
    require_admin(&session)?;

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("a title is required".to_string()));
    }

    let options: Vec<String> = req.options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() < 2 {
        return Err(AppError::Validation(
            "a poll needs at least two options".to_string(),
        ));
    }
    if options.iter().any(|o| o.is_empty()) {
        return Err(AppError::Validation(
            "option labels must not be empty".to_string(),
        ));
    }
    if req.start_time >= req.end_time {
        return Err(AppError::Validation(
            "the end time must be after the start time".to_string(),
        ));
    }

    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let poll = Poll::new(
        title,
        description,
        options,
        req.start_time,
        req.end_time,
        session.user_id,
    );
    state.db.create_poll(&poll).await?;
    info!("poll {} created by {}", poll.id, poll.created_by);

    Ok((StatusCode::CREATED, Json(poll)))
}

pub async fn list_polls(State(state): State<AppState>) -> AppResult<Json<Vec<PollSummary>>> {
    let now = Utc::now();
    let polls = state.db.list_polls().await?;

    let summaries = polls
        .into_iter()
        .map(|poll| PollSummary {
            active: is_poll_active(poll.start_time, poll.end_time, now),
            poll,
        })
        .collect();

    Ok(Json(summaries))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    session: Option<AuthSession>,
) -> AppResult<Json<PollDetail>> {
    let poll = state.db.get_poll(&poll_id).await?;
    let votes = state.db.get_poll_votes(&poll_id).await?;
    let summary = compute_results(&votes, &poll.options);

    let your_vote = session.and_then(|s| {
        votes
            .iter()
            .find(|v| v.user_id == s.user_id)
            .map(|v| v.selected_option.clone())
    });

    Ok(Json(PollDetail {
        active: is_poll_active(poll.start_time, poll.end_time, Utc::now()),
        results: results_payload(&summary),
        your_vote,
        poll,
    }))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    session: AuthSession,
    Json(req): Json<VoteRequest>,
) -> AppResult<(StatusCode, Json<VoteResponse>)> {
    let poll = state.db.get_poll(&poll_id).await?;

    if !is_poll_active(poll.start_time, poll.end_time, Utc::now()) {
        return Err(AppError::Forbidden(
            "voting is not open for this poll".to_string(),
        ));
    }
    if !poll.options.iter().any(|o| *o == req.selected_option) {
        return Err(AppError::Validation(
            "the selected option is not one of the poll's options".to_string(),
        ));
    }

    let vote = Vote::new(poll.id.clone(), session.user_id, req.selected_option);
    state.db.insert_vote(&vote).await?;
    info!("vote recorded on poll {} by {}", poll.id, vote.user_id);

    // Re-read after the insert so the returned results include this vote.
    let votes = state.db.get_poll_votes(&poll.id).await?;
    let summary = compute_results(&votes, &poll.options);

    Ok((
        StatusCode::CREATED,
        Json(VoteResponse {
            vote,
            results: results_payload(&summary),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Role;
    use chrono::Duration;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn test_state() -> AppState {
        let url = format!("sqlite:file:{}?mode=memory&cache=shared", Uuid::new_v4());
        let db = Database::connect(&url).await.expect("in-memory database");
        AppState::new(Arc::new(db), "test-secret".to_string())
    }

    fn session(id: &str, role: Role) -> AuthSession {
        AuthSession {
            user_id: id.to_string(),
            email: format!("{}@example.com", id),
            role,
        }
    }

    fn poll_request(start: DateTime<Utc>, end: DateTime<Utc>) -> CreatePollRequest {
        CreatePollRequest {
            title: "Team lunch".to_string(),
            description: None,
            options: vec!["Tacos".to_string(), "Ramen".to_string()],
            start_time: start,
            end_time: end,
        }
    }

    fn open_window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::hours(1), now + Duration::hours(1))
    }

    async fn create_open_poll(state: &AppState) -> Poll {
        let (start, end) = open_window();
        let (_, Json(poll)) = create_poll(
            State(state.clone()),
            session("admin", Role::Admin),
            Json(poll_request(start, end)),
        )
        .await
        .unwrap();
        poll
    }

    #[tokio::test]
    async fn creation_is_admin_only() {
        let state = test_state().await;
        let (start, end) = open_window();
        let denied = create_poll(
            State(state),
            session("v1", Role::Voter),
            Json(poll_request(start, end)),
        )
        .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn creation_validates_the_form() {
        let state = test_state().await;
        let admin = session("admin", Role::Admin);
        let (start, end) = open_window();

        let mut one_option = poll_request(start, end);
        one_option.options.truncate(1);
        assert!(matches!(
            create_poll(State(state.clone()), admin.clone(), Json(one_option)).await,
            Err(AppError::Validation(_))
        ));

        let mut blank_label = poll_request(start, end);
        blank_label.options[1] = "   ".to_string();
        assert!(matches!(
            create_poll(State(state.clone()), admin.clone(), Json(blank_label)).await,
            Err(AppError::Validation(_))
        ));

        let inverted = poll_request(end, start);
        assert!(matches!(
            create_poll(State(state), admin, Json(inverted)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn fresh_poll_lists_as_active_with_zero_results() {
        let state = test_state().await;
        let poll = create_open_poll(&state).await;

        let Json(listed) = list_polls(State(state.clone())).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].active);

        let Json(detail) = get_poll(State(state), Path(poll.id), None).await.unwrap();
        assert!(detail.active);
        assert_eq!(detail.results.total_votes, 0);
        assert!(detail.results.options.iter().all(|o| o.count == 0));
        assert!(detail.results.options.iter().all(|o| o.percentage == 0.0));
        assert!(detail.your_vote.is_none());
    }

    #[tokio::test]
    async fn vote_flow_updates_results_and_rejects_duplicates() {
        let state = test_state().await;
        let poll = create_open_poll(&state).await;

        let (status, Json(response)) = cast_vote(
            State(state.clone()),
            Path(poll.id.clone()),
            session("v1", Role::Voter),
            Json(VoteRequest {
                selected_option: "Tacos".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        // The response already reflects the new vote.
        assert_eq!(response.results.total_votes, 1);
        assert_eq!(response.results.options[0].percentage, 100.0);

        let duplicate = cast_vote(
            State(state.clone()),
            Path(poll.id.clone()),
            session("v1", Role::Voter),
            Json(VoteRequest {
                selected_option: "Ramen".to_string(),
            }),
        )
        .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let unknown = cast_vote(
            State(state.clone()),
            Path(poll.id.clone()),
            session("v2", Role::Voter),
            Json(VoteRequest {
                selected_option: "Pizza".to_string(),
            }),
        )
        .await;
        assert!(matches!(unknown, Err(AppError::Validation(_))));

        cast_vote(
            State(state.clone()),
            Path(poll.id.clone()),
            session("v2", Role::Voter),
            Json(VoteRequest {
                selected_option: "Ramen".to_string(),
            }),
        )
        .await
        .unwrap();

        let Json(detail) = get_poll(
            State(state),
            Path(poll.id),
            Some(session("v1", Role::Voter)),
        )
        .await
        .unwrap();
        assert_eq!(detail.results.total_votes, 2);
        assert_eq!(detail.results.options[0].percentage, 50.0);
        assert_eq!(detail.results.options[1].percentage, 50.0);
        assert_eq!(detail.your_vote.as_deref(), Some("Tacos"));
    }

    #[tokio::test]
    async fn voting_outside_the_window_is_forbidden() {
        let state = test_state().await;
        let admin = session("admin", Role::Admin);
        let now = Utc::now();

        let (_, Json(upcoming)) = create_poll(
            State(state.clone()),
            admin.clone(),
            Json(poll_request(
                now + Duration::hours(1),
                now + Duration::hours(2),
            )),
        )
        .await
        .unwrap();
        let (_, Json(ended)) = create_poll(
            State(state.clone()),
            admin,
            Json(poll_request(
                now - Duration::hours(2),
                now - Duration::hours(1),
            )),
        )
        .await
        .unwrap();

        for poll_id in [upcoming.id, ended.id] {
            let result = cast_vote(
                State(state.clone()),
                Path(poll_id),
                session("v1", Role::Voter),
                Json(VoteRequest {
                    selected_option: "Tacos".to_string(),
                }),
            )
            .await;
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }
    }

    #[tokio::test]
    async fn missing_poll_is_not_found() {
        let state = test_state().await;
        let result = get_poll(State(state), Path("missing".to_string()), None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
