// src/scoring.rs

use serde::Serialize;

use crate::config::{EXCELLENT_PERCENTAGE, PASSING_PERCENTAGE};

/// Qualitative label derived from a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Excellent,
    Passed,
    Failed,
    /// The exam had no questions, so there is nothing to grade.
    NotApplicable,
}

impl Verdict {
    pub fn from_percentage(percentage: Option<u32>) -> Self {
        match percentage {
            Some(p) if p >= EXCELLENT_PERCENTAGE => Verdict::Excellent,
            Some(p) if p >= PASSING_PERCENTAGE => Verdict::Passed,
            Some(_) => Verdict::Failed,
            None => Verdict::NotApplicable,
        }
    }
}

/// `round(100 * score / total)`, or `None` when there are no questions.
pub fn percentage(score: u32, total_questions: u32) -> Option<u32> {
    if total_questions == 0 {
        return None;
    }
    let ratio = f64::from(score) / f64::from(total_questions);
    Some((ratio * 100.0).round() as u32)
}

/// Score of one finished attempt, ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: Option<u32>,
    pub verdict: Verdict,
}

impl ScoreSummary {
    pub fn new(score: u32, total_questions: u32) -> Self {
        let percentage = percentage(score, total_questions);
        ScoreSummary {
            score,
            total_questions,
            percentage,
            verdict: Verdict::from_percentage(percentage),
        }
    }
}
