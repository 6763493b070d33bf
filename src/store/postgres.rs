// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use super::{ExamStore, ResultHistory, StoreError};
use crate::models::{
    exam::{Exam, ExamType},
    exam_result::{ExamResult, StoredResult},
    question::{Question, QuestionRow},
    user::{Identity, Student},
};

/// Store backed by the Postgres tables 'exams', 'exam_questions',
/// 'exam_results' and 'profiles'.
///
/// The pool is shared by every request, so this store has no caller of its
/// own: `current_identity` is always `None`. Request handlers wrap it in a
/// [`super::CallerStore`] carrying the authenticated caller.
#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        PgExamStore { pool }
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn list_exams_by_type(&self, exam_type: ExamType) -> Result<Vec<Exam>, StoreError> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"
            SELECT id, title, description, type, year
            FROM exams
            WHERE type = $1
            ORDER BY year DESC
            "#,
        )
        .bind(exam_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch {} exams: {:?}", exam_type, e);
            StoreError::from(e)
        })?;

        Ok(exams)
    }

    async fn list_questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT
                id,
                question_text,
                context_text,
                options,
                correct_answer,
                order_index,
                question_type
            FROM exam_questions
            WHERE exam_id = $1
            ORDER BY order_index ASC
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions of exam {}: {:?}", exam_id, e);
            StoreError::from(e)
        })?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        Ok(None)
    }

    async fn create_exam_result(&self, result: &ExamResult) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exam_results (user_id, exam_id, score, total_questions, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(result.user_id)
        .bind(result.exam_id)
        .bind(result.score)
        .bind(result.total_questions)
        .bind(Json(&result.details))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert exam result: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl ResultHistory for PgExamStore {
    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, first_name, last_name
            FROM profiles
            WHERE role = 'student'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn list_results(&self) -> Result<Vec<StoredResult>, StoreError> {
        let results = sqlx::query_as::<_, StoredResult>(
            r#"
            SELECT
                r.user_id,
                r.exam_id,
                e.type AS exam_type,
                r.score,
                r.total_questions,
                r.completed_at
            FROM exam_results r
            LEFT JOIN exams e ON e.id = r.exam_id
            ORDER BY r.completed_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }
}
