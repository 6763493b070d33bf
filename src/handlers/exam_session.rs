// src/handlers/exam_session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{exam::ExamType, user::Identity},
    session::SessionController,
    state::AppState,
    store::{Backend, CallerStore},
    utils::jwt::Caller,
};

/// DTO for choosing an exam family.
#[derive(Debug, Deserialize)]
pub struct SelectTypeRequest {
    pub exam_type: ExamType,
}

/// DTO for choosing one exam of the listed ones.
#[derive(Debug, Deserialize)]
pub struct SelectExamRequest {
    pub exam_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub option: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WriteAnswerRequest {
    #[validate(length(max = 5000, message = "Written answers are limited to 5000 characters."))]
    pub text: String,
}

/// Builds a controller recording results for the session's owner.
fn controller(
    state: &AppState,
    owner: Option<Identity>,
) -> SessionController<CallerStore<'_, dyn Backend>> {
    SessionController::new(
        CallerStore::new(state.backend.as_ref(), owner),
        state.config.store_timeout(),
    )
}

/// Opens a new exam session in type selection, owned by the caller.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, AppError> {
    let (id, session) = state.sessions.create(caller.0).await;
    let view = session.lock().await.view();

    tracing::info!("Created exam session {}", id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "session_id": id, "session": view })),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let view = owned.session.lock().await.view();
    Ok(Json(view))
}

/// Leaves the session; whatever was not saved is discarded.
pub async fn exit_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.remove(id, caller).await?;
    tracing::info!("Closed exam session {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_type(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;

    controller(&state, owned.owner)
        .select_type(&mut session, req.exam_type)
        .await?;

    Ok(Json(session.view()))
}

pub async fn select_exam(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;

    controller(&state, owned.owner)
        .select_exam(&mut session, req.exam_id)
        .await?;

    Ok(Json(session.view()))
}

pub async fn select_option(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;
    session.select_option(req.option)?;

    Ok(Json(session.view()))
}

pub async fn write_answer(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<WriteAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;
    session.write_answer(req.text)?;

    Ok(Json(session.view()))
}

/// Confirms the current answer.
///
/// A rejected confirm (no option, too few words) is not an error: the
/// outcome says so and the session is unchanged.
pub async fn confirm(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;

    let outcome = controller(&state, owned.owner).confirm(&mut session).await?;

    Ok(Json(json!({ "outcome": outcome, "session": session.view() })))
}

pub async fn back(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;
    session.back()?;

    Ok(Json(session.view()))
}

/// Starts a new attempt in the same session.
pub async fn reset(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;
    session.reset();

    Ok(Json(session.view()))
}

/// Retries storing a finished result that could not be saved.
pub async fn save_result(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.sessions.get(id, caller).await?;
    let mut session = owned.session.lock().await;

    let saved = controller(&state, owned.owner).save_result(&mut session).await?;

    Ok(Json(json!({ "saved": saved, "session": session.view() })))
}
