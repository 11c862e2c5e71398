//! HTTP route handlers for the chat API.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chat::core::errors::ChatError;
use crate::chat::core::ids::UserId;
use crate::chat::core::user_profile::User;
use crate::chat::evaluation::{
    ANSWER_OPTIONS, AnswerOption, EVALUATION_QUESTIONS, EvaluationAnswer, EvaluationOutcome,
    EvaluationQuestion, apply_evaluation,
};
use crate::chat::history::record::HistoryPage;

use super::state::AppState;

/// Header carrying the caller identity set by the authentication gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

type ApiError = (StatusCode, String);

/// Create the API router with all routes.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat/message", post(send_message))
        .route("/chat/history", get(chat_history))
        .route("/chat/questions", get(evaluation_questions))
        .route("/user", post(create_user))
        .route("/user/profile", get(get_profile).put(update_profile))
        .route("/user/evaluate", post(evaluate_level))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "conversafina",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Caller identity taken from the [`USER_ID_HEADER`] header.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .map(Self)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    format!("missing or invalid {USER_ID_HEADER} header"),
                )
            })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn error_response(err: ChatError) -> ApiError {
    let status = match &err {
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::AlreadyExists(_) => StatusCode::CONFLICT,
        ChatError::InvalidInput(_) | ChatError::InvalidTurn(_) => StatusCode::BAD_REQUEST,
        ChatError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }
    (status, err.to_string())
}

/// Question submitted to the advisor.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// The user's question.
    pub question: String,
}

/// Advisor reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Answer in Portuguese.
    pub answer: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let answer = state
        .advisor
        .ask(&user_id, &request.question)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse { answer }))
}

/// History query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// Page size; defaults to the configured page size.
    pub limit: Option<usize>,
    /// Cursor returned as `nextPageToken` by the previous page.
    pub start_after: Option<String>,
}

async fn chat_history(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.history.default_page_size);
    let page = state
        .history
        .read_page(&user_id, limit, query.start_after.as_deref())
        .await
        .map_err(error_response)?;
    Ok(Json(page))
}

/// Questionnaire payload.
#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    /// All questions.
    pub questions: &'static [EvaluationQuestion],
    /// Allowed answers.
    pub options: &'static [AnswerOption],
}

async fn evaluation_questions() -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: &EVALUATION_QUESTIONS,
        options: &ANSWER_OPTIONS,
    })
}

/// Editable profile fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    /// First name.
    pub name: String,
    /// Family name.
    pub second_name: String,
    /// Age in years.
    pub age: u32,
    /// Monthly income in BRL.
    pub income: f64,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ProfileRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if state
        .users
        .get_user(&user_id)
        .await
        .map_err(error_response)?
        .is_some()
    {
        return Err(error_response(ChatError::AlreadyExists(user_id)));
    }

    let user = User::new(
        user_id.clone(),
        request.name,
        request.second_name,
        request.age,
        request.income,
    );
    user.validate().map_err(error_response)?;
    state.users.save_user(&user).await.map_err(error_response)?;
    info!(%user_id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<User>, ApiError> {
    state
        .users
        .get_user(&user_id)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| error_response(ChatError::NotFound(user_id)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let mut user = state
        .users
        .get_user(&user_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(ChatError::NotFound(user_id)))?;

    user.name = request.name;
    user.second_name = request.second_name;
    user.age = request.age;
    user.income = request.income;
    user.validate().map_err(error_response)?;

    state.users.save_user(&user).await.map_err(error_response)?;
    Ok(Json(user))
}

/// Submitted questionnaire.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    /// Answers; required.
    pub answers: Option<Vec<EvaluationAnswer>>,
}

async fn evaluate_level(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluationOutcome>, ApiError> {
    let answers = request.answers.ok_or_else(|| {
        error_response(ChatError::InvalidInput("answers are required".to_string()))
    })?;
    let outcome = apply_evaluation(state.users.as_ref(), &user_id, &answers)
        .await
        .map_err(error_response)?;
    Ok(Json(outcome))
}
