// src/handlers/results.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{
    error::AppError,
    stats::{leaderboard, student_stats},
    store::Backend,
    utils::jwt::Claims,
};

/// Ranks all students by average score plus an activity bonus.
pub async fn get_leaderboard(
    State(backend): State<Arc<dyn Backend>>,
) -> Result<impl IntoResponse, AppError> {
    let students = backend.list_students().await.map_err(|e| {
        tracing::error!("Failed to fetch students: {:?}", e);
        AppError::from(e)
    })?;
    let results = backend.list_results().await.map_err(|e| {
        tracing::error!("Failed to fetch results: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(leaderboard(&students, &results)))
}

/// Statistics and stored results of the authenticated student.
pub async fn my_results(
    State(backend): State<Arc<dyn Backend>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let identity = claims
        .identity()
        .ok_or_else(|| AppError::AuthError("Invalid subject".to_string()))?;

    let results: Vec<_> = backend
        .list_results()
        .await?
        .into_iter()
        .filter(|r| r.user_id == identity.id)
        .collect();

    Ok(Json(json!({
        "stats": student_stats(&results),
        "results": results,
    })))
}
