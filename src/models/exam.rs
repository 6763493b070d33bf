// src/models/exam.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The two exam families a student can practise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "URT")]
    Urt,
    #[serde(rename = "TOC")]
    Toc,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Urt => "URT",
            ExamType::Toc => "TOC",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown exam type '{0}'")]
pub struct ParseExamTypeError(String);

impl FromStr for ExamType {
    type Err = ParseExamTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "URT" => Ok(ExamType::Urt),
            "TOC" => Ok(ExamType::Toc),
            other => Err(ParseExamTypeError(other.to_string())),
        }
    }
}

impl TryFrom<String> for ExamType {
    type Error = ParseExamTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'exams' table.
/// An exam identifies a fixed, ordered set of questions.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    #[sqlx(default)]
    #[serde(default)]
    pub description: Option<String>,

    /// Mapped from the column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub exam_type: ExamType,

    pub year: i32,
}
