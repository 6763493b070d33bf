// src/stats.rs

//! Aggregates over stored results: per-student statistics and the leaderboard.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::EXAMS_TAKEN_RANK_WEIGHT,
    models::{exam_result::StoredResult, user::Student},
    scoring::Verdict,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub exams_taken: u32,
    /// Mean of the per-exam percentages, rounded.
    pub average_score: u32,
    pub last_active: Option<DateTime<Utc>>,
    /// Distinct exam types attempted, in first-seen order.
    pub exam_types: Vec<String>,
    /// `None` until at least one exam was taken.
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub name: String,
    pub rank_power: u32,
    #[serde(flatten)]
    pub stats: StudentStats,
}

/// Percentage of one stored result; a result without questions counts as 0.
fn result_percentage(result: &StoredResult) -> f64 {
    if result.total_questions > 0 {
        f64::from(result.score) / f64::from(result.total_questions) * 100.0
    } else {
        0.0
    }
}

/// Statistics over the results of one student.
pub fn student_stats<'a>(results: impl IntoIterator<Item = &'a StoredResult>) -> StudentStats {
    let mut exams_taken = 0u32;
    let mut total_percentage = 0.0;
    let mut last_active: Option<DateTime<Utc>> = None;
    let mut exam_types: Vec<String> = Vec::new();

    for result in results {
        exams_taken += 1;
        total_percentage += result_percentage(result);

        if let Some(at) = result.completed_at {
            last_active = Some(last_active.map_or(at, |prev| prev.max(at)));
        }
        if let Some(exam_type) = &result.exam_type {
            if !exam_types.contains(exam_type) {
                exam_types.push(exam_type.clone());
            }
        }
    }

    let average_score = if exams_taken > 0 {
        (total_percentage / f64::from(exams_taken)).round() as u32
    } else {
        0
    };

    StudentStats {
        exams_taken,
        average_score,
        last_active,
        exam_types,
        verdict: (exams_taken > 0).then(|| Verdict::from_percentage(Some(average_score))),
    }
}

/// Ranks every student by `average_score + 5 * exams_taken`, highest first.
/// Students without results are listed with zeros; ties keep input order.
pub fn leaderboard(students: &[Student], results: &[StoredResult]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = students
        .iter()
        .map(|student| {
            let stats = student_stats(results.iter().filter(|r| r.user_id == student.id));
            LeaderboardEntry {
                user_id: student.id,
                name: student.display_name(),
                rank_power: stats.average_score + EXAMS_TAKEN_RANK_WEIGHT * stats.exams_taken,
                stats,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.rank_power.cmp(&a.rank_power));
    entries
}
