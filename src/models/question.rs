// src/models/question.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};

use crate::config::FREE_TEXT_MARKER;

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Exactly one of the listed options is officially correct.
    SingleChoice,
    /// A written response; any sufficiently long submission is accepted.
    FreeText,
}

/// A question of one exam, with its options already normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    #[serde(default)]
    pub context_text: Option<String>,

    /// Either a list of strings or a JSON-encoded string holding one.
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<String>,

    pub correct_answer: String,
    pub order_index: i32,

    /// Free-form category, e.g. "Grammatik" or "Schriftlicher Ausdruck (E-mail)".
    pub question_type: String,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        if self.question_type.contains(FREE_TEXT_MARKER) {
            QuestionKind::FreeText
        } else {
            QuestionKind::SingleChoice
        }
    }
}

/// Represents a row of the 'exam_questions' table.
/// `options` is a JSONB column that holds either an array or a string.
#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub question_text: String,
    pub context_text: Option<String>,
    pub options: Option<Json<Value>>,
    pub correct_answer: String,
    pub order_index: i32,
    pub question_type: String,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        let options = row
            .options
            .map(|Json(value)| decode_options(&value))
            .unwrap_or_default();

        Question {
            id: row.id,
            question_text: row.question_text,
            context_text: row.context_text,
            options,
            correct_answer: row.correct_answer,
            order_index: row.order_index,
            question_type: row.question_type,
        }
    }
}

/// Normalises an `options` payload into a list of strings.
///
/// Accepts a JSON array of strings or a string containing one. Anything that
/// does not decode yields an empty list, which renders no selectable choices.
pub fn decode_options(value: &Value) -> Vec<String> {
    let decoded = match value {
        Value::Array(_) => serde_json::from_value::<Vec<String>>(value.clone()),
        Value::String(encoded) => serde_json::from_str::<Vec<String>>(encoded),
        Value::Null => return Vec::new(),
        other => {
            tracing::warn!("Unexpected options payload: {}", other);
            return Vec::new();
        }
    };

    decoded.unwrap_or_else(|e| {
        tracing::warn!("Failed to decode question options: {}", e);
        Vec::new()
    })
}

fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decode_options(&value))
}

/// Counts the whitespace-separated words of a written answer.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// DTO for sending a question to the client (excludes the correct answer).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub context_text: Option<String>,
    pub options: Vec<String>,
    pub question_type: String,
    pub kind: QuestionKind,
    pub order_index: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_text: q.question_text.clone(),
            context_text: q.context_text.clone(),
            options: q.options.clone(),
            question_type: q.question_type.clone(),
            kind: q.kind(),
            order_index: q.order_index,
        }
    }
}
