// src/store/mod.rs

//! Capabilities the exam session depends on.
//!
//! Everything durable (exams, questions, results, identity) lives in an
//! external backend. The session controller only sees [`ExamStore`], so a
//! Postgres-backed store and an in-memory one are interchangeable.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{
    exam::{Exam, ExamType},
    exam_result::{ExamResult, StoredResult},
    question::Question,
    user::{Identity, Student},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryExamStore;
pub use postgres::PgExamStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The four operations an exam session needs from the outside world.
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// All exams of one type, newest year first.
    async fn list_exams_by_type(&self, exam_type: ExamType) -> Result<Vec<Exam>, StoreError>;

    /// Questions of one exam, ascending by `order_index`.
    async fn list_questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError>;

    /// The caller on whose behalf results are recorded, if any.
    async fn current_identity(&self) -> Result<Option<Identity>, StoreError>;

    async fn create_exam_result(&self, result: &ExamResult) -> Result<(), StoreError>;
}

/// Read access to stored results, for leaderboard and statistics.
#[async_trait]
pub trait ResultHistory: Send + Sync {
    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Every stored result joined with its exam type, oldest first.
    async fn list_results(&self) -> Result<Vec<StoredResult>, StoreError>;
}

/// A full backend, as shared through the application state.
pub trait Backend: ExamStore + ResultHistory {}

impl<T: ExamStore + ResultHistory> Backend for T {}

/// Binds a shared store to the student a session belongs to.
///
/// Data operations are delegated; `current_identity` answers with that
/// student instead of asking the inner store.
pub struct CallerStore<'a, S: ?Sized> {
    inner: &'a S,
    caller: Option<Identity>,
}

impl<'a, S: ?Sized> CallerStore<'a, S> {
    pub fn new(inner: &'a S, caller: Option<Identity>) -> Self {
        CallerStore { inner, caller }
    }
}

#[async_trait]
impl<'a, S> ExamStore for CallerStore<'a, S>
where
    S: ExamStore + ?Sized,
{
    async fn list_exams_by_type(&self, exam_type: ExamType) -> Result<Vec<Exam>, StoreError> {
        self.inner.list_exams_by_type(exam_type).await
    }

    async fn list_questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        self.inner.list_questions_by_exam(exam_id).await
    }

    async fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        Ok(self.caller)
    }

    async fn create_exam_result(&self, result: &ExamResult) -> Result<(), StoreError> {
        self.inner.create_exam_result(result).await
    }
}
