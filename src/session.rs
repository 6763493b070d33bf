// src/session.rs

//! The exam-taking state machine.
//!
//! A session moves through type selection, exam selection and the quiz to a
//! result. Answers are accumulated in memory and a single aggregate result is
//! written when the last question is confirmed.

use std::{future::Future, time::Duration};

use serde::Serialize;

use crate::{
    config::MIN_WRITTEN_WORDS,
    models::{
        exam::{Exam, ExamType},
        exam_result::{ExamResult, StudentAnswer},
        question::{PublicQuestion, Question, QuestionKind, word_count},
    },
    scoring::ScoreSummary,
    store::{ExamStore, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No exams found for {0}")]
    NoExams(ExamType),

    #[error("No questions found for exam {0}")]
    NoQuestions(i64),

    #[error("Exam {0} is not part of the current selection")]
    UnknownExam(i64),

    #[error("'{0}' is not an option of the current question")]
    UnknownOption(String),

    #[error("Cannot {action} while in {state}")]
    InvalidAction {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One attempt, from type selection to result.
#[derive(Debug, Clone, Default)]
pub enum ExamSession {
    #[default]
    TypeSelection,
    ExamSelection(ExamSelection),
    Quiz(Quiz),
    Result(ExamOutcome),
}

#[derive(Debug, Clone)]
pub struct ExamSelection {
    pub exam_type: ExamType,
    /// Newest year first.
    pub exams: Vec<Exam>,
}

/// An exam in progress. `cursor` always points into `questions`.
#[derive(Debug, Clone)]
pub struct Quiz {
    selection: ExamSelection,
    exam: Exam,
    questions: Vec<Question>,
    cursor: usize,
    score: u32,
    answers: Vec<StudentAnswer>,
    draft: Draft,
}

/// Per-question input that has not been confirmed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Draft {
    #[default]
    Empty,
    Selected(String),
    Written(String),
}

impl Quiz {
    pub fn current(&self) -> &Question {
        &self.questions[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn answers(&self) -> &[StudentAnswer] {
        &self.answers
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    fn is_last(&self) -> bool {
        self.cursor + 1 >= self.questions.len()
    }

    /// The answer that would be recorded on confirm, or why there is none.
    fn pending_answer(&self) -> Result<String, RejectReason> {
        match (self.current().kind(), &self.draft) {
            (QuestionKind::SingleChoice, Draft::Selected(option)) => Ok(option.clone()),
            (QuestionKind::SingleChoice, _) => Err(RejectReason::NoOptionSelected),
            (QuestionKind::FreeText, Draft::Written(text)) => {
                let words = word_count(text);
                if words < MIN_WRITTEN_WORDS {
                    Err(RejectReason::TooFewWords { words })
                } else {
                    Ok(text.clone())
                }
            }
            (QuestionKind::FreeText, _) => Err(RejectReason::TooFewWords { words: 0 }),
        }
    }
}

/// Whether the final result reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SaveStatus {
    Saved,
    Unsaved(UnsavedReason),
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum UnsavedReason {
    /// Nobody is signed in, so there is no one to record the result for.
    Anonymous,
    TimedOut,
    Failed(String),
}

impl From<StoreError> for UnsavedReason {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) => UnsavedReason::TimedOut,
            other => UnsavedReason::Failed(other.to_string()),
        }
    }
}

/// Terminal state of a session.
#[derive(Debug, Clone, Serialize)]
pub struct ExamOutcome {
    pub exam: Exam,
    #[serde(flatten)]
    pub summary: ScoreSummary,
    pub answers: Vec<StudentAnswer>,
    pub saved: SaveStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    NoOptionSelected,
    TooFewWords { words: usize },
}

/// Shown right after an answer is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub question_id: i64,
    pub correct: bool,
    /// Only for single-choice questions.
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// The guard failed; nothing changed.
    Rejected { reason: RejectReason },
    Advanced { feedback: Feedback },
    Finished { feedback: Feedback, saved: SaveStatus },
}

impl ExamSession {
    pub fn state_name(&self) -> &'static str {
        match self {
            ExamSession::TypeSelection => "type_selection",
            ExamSession::ExamSelection(_) => "exam_selection",
            ExamSession::Quiz(_) => "quiz",
            ExamSession::Result(_) => "result",
        }
    }

    fn quiz_mut(&mut self, action: &'static str) -> Result<&mut Quiz, SessionError> {
        match self {
            ExamSession::Quiz(quiz) => Ok(quiz),
            other => Err(SessionError::InvalidAction {
                action,
                state: other.state_name(),
            }),
        }
    }

    /// Picks an option of the current single-choice question.
    pub fn select_option(&mut self, option: String) -> Result<(), SessionError> {
        let quiz = self.quiz_mut("select an option")?;
        let question = quiz.current();

        if question.kind() != QuestionKind::SingleChoice {
            return Err(SessionError::InvalidAction {
                action: "select an option",
                state: "a written question",
            });
        }
        if !question.options.contains(&option) {
            return Err(SessionError::UnknownOption(option));
        }

        quiz.draft = Draft::Selected(option);
        Ok(())
    }

    /// Replaces the written-answer buffer of the current free-text question.
    pub fn write_answer(&mut self, text: String) -> Result<(), SessionError> {
        let quiz = self.quiz_mut("write an answer")?;

        if quiz.current().kind() != QuestionKind::FreeText {
            return Err(SessionError::InvalidAction {
                action: "write an answer",
                state: "a single-choice question",
            });
        }

        quiz.draft = Draft::Written(text);
        Ok(())
    }

    /// Quiz goes back to the exam list, the exam list back to type selection.
    pub fn back(&mut self) -> Result<(), SessionError> {
        *self = match std::mem::take(self) {
            ExamSession::Quiz(quiz) => ExamSession::ExamSelection(quiz.selection),
            ExamSession::ExamSelection(_) => ExamSession::TypeSelection,
            other => {
                let state = other.state_name();
                *self = other;
                return Err(SessionError::InvalidAction {
                    action: "go back",
                    state,
                });
            }
        };
        Ok(())
    }

    /// Discards the attempt and starts over.
    pub fn reset(&mut self) {
        *self = ExamSession::TypeSelection;
    }

    pub fn view(&self) -> SessionView {
        match self {
            ExamSession::TypeSelection => SessionView::TypeSelection {
                exam_types: vec![ExamType::Urt, ExamType::Toc],
            },
            ExamSession::ExamSelection(selection) => SessionView::ExamSelection {
                exam_type: selection.exam_type,
                exams: selection.exams.clone(),
            },
            ExamSession::Quiz(quiz) => {
                let (selected_option, written_answer) = match &quiz.draft {
                    Draft::Empty => (None, None),
                    Draft::Selected(option) => (Some(option.clone()), None),
                    Draft::Written(text) => (None, Some(text.clone())),
                };
                let total = quiz.total_questions();
                SessionView::Quiz {
                    exam: quiz.exam.clone(),
                    question: PublicQuestion::from(quiz.current()),
                    position: quiz.cursor + 1,
                    total_questions: total,
                    progress: ((quiz.cursor + 1) * 100 / total) as u32,
                    word_count: written_answer.as_deref().map(word_count).unwrap_or(0),
                    selected_option,
                    written_answer,
                    can_confirm: quiz.pending_answer().is_ok(),
                }
            }
            ExamSession::Result(outcome) => SessionView::Result(outcome.clone()),
        }
    }
}

/// What the client renders for a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionView {
    TypeSelection {
        exam_types: Vec<ExamType>,
    },
    ExamSelection {
        exam_type: ExamType,
        exams: Vec<Exam>,
    },
    Quiz {
        exam: Exam,
        question: PublicQuestion,
        /// 1-based.
        position: usize,
        total_questions: usize,
        progress: u32,
        selected_option: Option<String>,
        written_answer: Option<String>,
        word_count: usize,
        can_confirm: bool,
    },
    Result(ExamOutcome),
}

/// Drives sessions against an exam store.
///
/// Every store round-trip is bounded by `timeout`.
pub struct SessionController<S> {
    store: S,
    timeout: Duration,
}

impl<S: ExamStore> SessionController<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        SessionController { store, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    /// Lists the exams of `exam_type` and moves to exam selection.
    /// With no exams the session stays in type selection.
    pub async fn select_type(
        &self,
        session: &mut ExamSession,
        exam_type: ExamType,
    ) -> Result<(), SessionError> {
        if !matches!(session, ExamSession::TypeSelection) {
            return Err(SessionError::InvalidAction {
                action: "select an exam type",
                state: session.state_name(),
            });
        }

        let exams = self.bounded(self.store.list_exams_by_type(exam_type)).await?;
        if exams.is_empty() {
            tracing::info!("No exams available for type {}", exam_type);
            return Err(SessionError::NoExams(exam_type));
        }

        *session = ExamSession::ExamSelection(ExamSelection { exam_type, exams });
        Ok(())
    }

    /// Loads the questions of one listed exam and starts the quiz.
    /// With no questions the session stays in exam selection.
    pub async fn select_exam(
        &self,
        session: &mut ExamSession,
        exam_id: i64,
    ) -> Result<(), SessionError> {
        let ExamSession::ExamSelection(selection) = &*session else {
            return Err(SessionError::InvalidAction {
                action: "select an exam",
                state: session.state_name(),
            });
        };

        let exam = selection
            .exams
            .iter()
            .find(|e| e.id == exam_id)
            .cloned()
            .ok_or(SessionError::UnknownExam(exam_id))?;

        let questions = self.bounded(self.store.list_questions_by_exam(exam_id)).await?;
        if questions.is_empty() {
            tracing::info!("Exam {} has no questions", exam_id);
            return Err(SessionError::NoQuestions(exam_id));
        }

        tracing::info!(
            "Starting exam {} '{}' with {} questions",
            exam.id,
            exam.title,
            questions.len()
        );

        *session = ExamSession::Quiz(Quiz {
            selection: selection.clone(),
            exam,
            questions,
            cursor: 0,
            score: 0,
            answers: Vec::new(),
            draft: Draft::Empty,
        });
        Ok(())
    }

    /// Records the pending answer of the current question and advances.
    ///
    /// A missing option or a written answer below the word minimum is
    /// rejected without touching the session. Confirming the last question
    /// finishes the attempt.
    pub async fn confirm(&self, session: &mut ExamSession) -> Result<ConfirmOutcome, SessionError> {
        let quiz = session.quiz_mut("confirm an answer")?;

        let answer = match quiz.pending_answer() {
            Ok(answer) => answer,
            Err(reason) => return Ok(ConfirmOutcome::Rejected { reason }),
        };

        let question = quiz.current();
        let feedback = match question.kind() {
            // Written answers are accepted as submitted.
            QuestionKind::FreeText => Feedback {
                question_id: question.id,
                correct: true,
                correct_answer: None,
            },
            QuestionKind::SingleChoice => Feedback {
                question_id: question.id,
                correct: answer == question.correct_answer,
                correct_answer: Some(question.correct_answer.clone()),
            },
        };

        quiz.answers.push(StudentAnswer {
            question_id: feedback.question_id,
            answer,
        });
        if feedback.correct {
            quiz.score += 1;
        }

        if !quiz.is_last() {
            quiz.cursor += 1;
            quiz.draft = Draft::Empty;
            return Ok(ConfirmOutcome::Advanced { feedback });
        }

        let outcome = match std::mem::take(session) {
            ExamSession::Quiz(quiz) => self.finish(quiz).await,
            other => {
                *session = other;
                return Err(SessionError::InvalidAction {
                    action: "finish the exam",
                    state: session.state_name(),
                });
            }
        };
        let saved = outcome.saved.clone();
        *session = ExamSession::Result(outcome);

        Ok(ConfirmOutcome::Finished { feedback, saved })
    }

    /// Tries again to store a result that could not be saved.
    pub async fn save_result(&self, session: &mut ExamSession) -> Result<SaveStatus, SessionError> {
        let ExamSession::Result(outcome) = &mut *session else {
            return Err(SessionError::InvalidAction {
                action: "save a result",
                state: session.state_name(),
            });
        };

        if !outcome.saved.is_saved() {
            outcome.saved = self.persist(outcome).await;
        }
        Ok(outcome.saved.clone())
    }

    async fn finish(&self, quiz: Quiz) -> ExamOutcome {
        let summary = ScoreSummary::new(quiz.score, quiz.questions.len() as u32);
        let mut outcome = ExamOutcome {
            exam: quiz.exam,
            summary,
            answers: quiz.answers,
            saved: SaveStatus::Unsaved(UnsavedReason::Anonymous),
        };
        outcome.saved = self.persist(&outcome).await;
        outcome
    }

    async fn persist(&self, outcome: &ExamOutcome) -> SaveStatus {
        let identity = match self.bounded(self.store.current_identity()).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::warn!(
                    "No signed-in user, result of exam {} is not recorded",
                    outcome.exam.id
                );
                return SaveStatus::Unsaved(UnsavedReason::Anonymous);
            }
            Err(e) => {
                tracing::warn!("Failed to resolve identity: {}", e);
                return SaveStatus::Unsaved(e.into());
            }
        };

        let result = ExamResult {
            user_id: identity.id,
            exam_id: outcome.exam.id,
            score: outcome.summary.score as i32,
            total_questions: outcome.summary.total_questions as i32,
            details: outcome.answers.clone(),
        };

        match self.bounded(self.store.create_exam_result(&result)).await {
            Ok(()) => {
                tracing::info!(
                    "Saved result {}/{} of user {} for exam {}",
                    result.score,
                    result.total_questions,
                    result.user_id,
                    result.exam_id
                );
                SaveStatus::Saved
            }
            Err(e) => {
                tracing::warn!("Failed to save exam result: {}", e);
                SaveStatus::Unsaved(e.into())
            }
        }
    }
}
