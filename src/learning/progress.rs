//! Derives course progress from the ledger.
//!
//! The ledger is the only stored representation of progress; percentages are
//! always computed here at read time.

use super::models::{CourseProgress, LectureProgress};

/// Attempts kept per (user, course, lecture); older ones are evicted.
pub const MAX_QUIZ_ATTEMPTS: usize = 5;

/// `round(100 * completed / total)`, 0 for an empty course, never above 100.
pub fn completion_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * completed as f64 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Builds the progress read model. Rows for lectures that no longer exist
/// (index >= `total_lectures`) are ignored.
pub fn build_progress(total_lectures: usize, rows: &[LectureProgress]) -> CourseProgress {
    let mut completed_lecture_indices: Vec<usize> = rows
        .iter()
        .filter(|row| row.lecture_completed && row.lecture_index < total_lectures)
        .map(|row| row.lecture_index)
        .collect();
    let mut completed_quiz_indices: Vec<usize> = rows
        .iter()
        .filter(|row| row.quiz_passed && row.lecture_index < total_lectures)
        .map(|row| row.lecture_index)
        .collect();
    completed_lecture_indices.sort_unstable();
    completed_lecture_indices.dedup();
    completed_quiz_indices.sort_unstable();
    completed_quiz_indices.dedup();

    let completed_lectures = completed_lecture_indices.len();
    CourseProgress {
        total_lectures,
        completed_lectures,
        overall_progress: completion_percent(completed_lectures, total_lectures),
        completed_lecture_indices,
        completed_quiz_indices,
    }
}
