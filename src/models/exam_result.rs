// src/models/exam_result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One answer given during a session. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub question_id: i64,
    pub answer: String,
}

/// The aggregate record written once, at the end of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub user_id: i64,
    pub exam_id: i64,
    pub score: i32,
    pub total_questions: i32,
    /// Answers in presentation order.
    pub details: Vec<StudentAnswer>,
}

/// A stored row of 'exam_results', joined with the exam's type.
/// Used for leaderboard and statistics.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredResult {
    pub user_id: i64,
    pub exam_id: i64,
    pub exam_type: Option<String>,
    pub score: i32,
    pub total_questions: i32,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
