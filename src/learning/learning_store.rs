use anyhow::Result;

use super::models::{Course, Enrollment, LearningCounts, LectureProgress, QuizAttempt};

pub trait LearningStore: Send + Sync {
    /// Stores a course together with its lectures.
    fn create_course(&self, course: &Course) -> Result<()>;

    /// Returns Ok(None) if the course does not exist.
    fn get_course(&self, course_id: &str) -> Result<Option<Course>>;

    /// Returns all courses, newest first, optionally restricted to a tag.
    fn list_courses(&self, tag: Option<&str>) -> Result<Vec<Course>>;

    /// Replaces the course row and its lectures.
    /// Returns false if the course does not exist.
    fn update_course(&self, course: &Course) -> Result<bool>;

    /// Deletes the course with its enrollments and ledger rows.
    fn delete_course(&self, course_id: &str) -> Result<bool>;

    /// Returns false if the user was already enrolled.
    fn add_enrollment(&self, enrollment: &Enrollment) -> Result<bool>;

    fn get_enrollment(&self, user_id: usize, course_id: &str) -> Result<Option<Enrollment>>;

    /// Removes the enrollment only; ledger rows are kept.
    fn delete_enrollment(&self, user_id: usize, course_id: &str) -> Result<bool>;

    fn list_user_enrollments(&self, user_id: usize) -> Result<Vec<Enrollment>>;

    fn set_current_lecture(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> Result<bool>;

    /// Appends the attempt, evicts history beyond `max_attempts` oldest
    /// first, and on a pass marks both the quiz and the lecture complete.
    /// All of it happens in one transaction.
    fn record_quiz_attempt(
        &self,
        user_id: usize,
        course_id: &str,
        attempt: &QuizAttempt,
        max_attempts: usize,
    ) -> Result<()>;

    /// Idempotently marks a lecture complete.
    fn mark_lecture_completed(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> Result<()>;

    fn get_lecture_progress(&self, user_id: usize, course_id: &str)
        -> Result<Vec<LectureProgress>>;

    /// Attempt history, newest first.
    fn get_quiz_attempts(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> Result<Vec<QuizAttempt>>;

    fn count(&self) -> Result<LearningCounts>;
}
