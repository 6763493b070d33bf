// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use super::{ExamStore, ResultHistory, StoreError};
use crate::models::{
    exam::{Exam, ExamType},
    exam_result::{ExamResult, StoredResult},
    question::Question,
    user::{Identity, Student},
};

/// In-process store used by tests and local demos.
///
/// Data is returned in the same order the Postgres store guarantees,
/// regardless of insertion order.
#[derive(Default)]
pub struct MemoryExamStore {
    exams: Vec<Exam>,
    questions: HashMap<i64, Vec<Question>>,
    students: Vec<Student>,
    identity: Option<Identity>,
    results: Mutex<Vec<StoredResult>>,
    saved: Mutex<Vec<ExamResult>>,
    fail_writes: AtomicBool,
    read_delay: Option<Duration>,
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exam(mut self, exam: Exam, questions: Vec<Question>) -> Self {
        self.questions.insert(exam.id, questions);
        self.exams.push(exam);
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_student(mut self, student: Student) -> Self {
        self.students.push(student);
        self
    }

    pub fn with_result(self, result: StoredResult) -> Self {
        self.lock_results().push(result);
        self
    }

    /// Delays every read, to exercise timeouts.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Makes `create_exam_result` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Results written through `create_exam_result`, in write order.
    pub fn saved_results(&self) -> Vec<ExamResult> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, Vec<StoredResult>> {
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn list_exams_by_type(&self, exam_type: ExamType) -> Result<Vec<Exam>, StoreError> {
        self.simulate_latency().await;

        let mut exams: Vec<Exam> = self
            .exams
            .iter()
            .filter(|e| e.exam_type == exam_type)
            .cloned()
            .collect();
        exams.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(exams)
    }

    async fn list_questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        self.simulate_latency().await;

        let mut questions = self.questions.get(&exam_id).cloned().unwrap_or_default();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        Ok(self.identity)
    }

    async fn create_exam_result(&self, result: &ExamResult) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        let exam_type = self
            .exams
            .iter()
            .find(|e| e.id == result.exam_id)
            .map(|e| e.exam_type.to_string());

        self.lock_results().push(StoredResult {
            user_id: result.user_id,
            exam_id: result.exam_id,
            exam_type,
            score: result.score,
            total_questions: result.total_questions,
            completed_at: Some(chrono::Utc::now()),
        });
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result.clone());
        Ok(())
    }
}

#[async_trait]
impl ResultHistory for MemoryExamStore {
    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.students.clone())
    }

    async fn list_results(&self) -> Result<Vec<StoredResult>, StoreError> {
        Ok(self.lock_results().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(id: i64, exam_type: ExamType, year: i32) -> Exam {
        Exam {
            id,
            title: format!("{} {}", exam_type, year),
            description: None,
            exam_type,
            year,
        }
    }

    #[tokio::test]
    async fn test_exams_listed_newest_first() {
        let store = MemoryExamStore::new()
            .with_exam(exam(1, ExamType::Urt, 2021), vec![])
            .with_exam(exam(2, ExamType::Toc, 2022), vec![])
            .with_exam(exam(3, ExamType::Urt, 2023), vec![]);

        let years: Vec<i32> = store
            .list_exams_by_type(ExamType::Urt)
            .await
            .unwrap()
            .iter()
            .map(|e| e.year)
            .collect();

        assert_eq!(years, vec![2023, 2021]);
    }

    #[tokio::test]
    async fn test_failing_writes_are_reported() {
        let store = MemoryExamStore::new();
        store.set_fail_writes(true);

        let result = ExamResult {
            user_id: 1,
            exam_id: 1,
            score: 0,
            total_questions: 1,
            details: vec![],
        };

        assert!(store.create_exam_result(&result).await.is_err());
        assert!(store.saved_results().is_empty());

        store.set_fail_writes(false);
        store.create_exam_result(&result).await.unwrap();
        assert_eq!(store.saved_results(), vec![result]);
    }
}
