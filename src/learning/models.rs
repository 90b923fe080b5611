//! Course catalog and learning progress models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub title: String,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub teacher_id: usize,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub tags: Vec<String>,
    pub published: bool,
    pub lectures: Vec<Lecture>,
    pub created: i64,
    pub updated: i64,
}

impl Course {
    pub fn total_lectures(&self) -> usize {
        self.lectures.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
}

/// Partial course edit; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
    pub lectures: Option<Vec<Lecture>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user_id: usize,
    pub course_id: String,
    pub enrolled_at: i64,
    pub current_lecture: usize,
}

/// An enrollment with its progress derived from the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentOverview {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course_title: String,
    pub total_lectures: usize,
    pub completed_lectures: usize,
    pub overall_progress: u8,
}

/// One ledger row, keyed by (user, course, lecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LectureProgress {
    pub lecture_index: usize,
    pub lecture_completed: bool,
    pub quiz_passed: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub score: i64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub lecture_index: usize,
    pub score: u8,
    pub passed: bool,
    pub attempted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub total_lectures: usize,
    pub completed_lectures: usize,
    pub overall_progress: u8,
    pub completed_lecture_indices: Vec<usize>,
    pub completed_quiz_indices: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttemptOutcome {
    pub attempt: QuizAttempt,
    pub progress: CourseProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningCounts {
    pub courses: usize,
    pub published_courses: usize,
    pub enrollments: usize,
    pub quiz_attempts: usize,
}
