use std::sync::Arc;

use tracing::{debug, info};

use super::learning_store::LearningStore;
use super::models::{
    Course, CourseDraft, CourseProgress, CourseUpdate, Enrollment, EnrollmentOverview,
    LearningCounts, Lecture, QuizAttempt, QuizAttemptOutcome, QuizResult,
};
use super::progress::{build_progress, MAX_QUIZ_ATTEMPTS};
use crate::error::{ServiceError, ServiceResult, Validator};
use crate::server::metrics;
use crate::sqlite_persistence::{new_entity_id, now_secs};
use crate::user::Actor;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 10_000;
const MAX_TAGS: usize = 20;

fn validate_course_fields(
    title: Option<&str>,
    description: Option<&str>,
    price_cents: Option<i64>,
    tags: Option<&[String]>,
    lectures: Option<&[Lecture]>,
) -> ServiceResult<()> {
    let mut validator = Validator::new();
    if let Some(title) = title {
        validator
            .non_blank(title, "title")
            .max_len(title, MAX_TITLE_LENGTH, "title");
    }
    if let Some(description) = description {
        validator.max_len(description, MAX_DESCRIPTION_LENGTH, "description");
    }
    if let Some(price_cents) = price_cents {
        validator.check(price_cents >= 0, "priceCents", "must not be negative");
    }
    if let Some(tags) = tags {
        validator
            .check(tags.len() <= MAX_TAGS, "tags", "at most 20 tags")
            .check(
                tags.iter().all(|tag| !tag.trim().is_empty()),
                "tags",
                "must not contain empty tags",
            );
    }
    if let Some(lectures) = lectures {
        validator.check(
            lectures.iter().all(|lecture| !lecture.title.trim().is_empty()),
            "lectures",
            "every lecture needs a title",
        );
    }
    validator.finish()
}

/// Course catalog, enrollments and the progress ledger.
pub struct LearningManager {
    store: Arc<dyn LearningStore>,
}

impl LearningManager {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self { store }
    }

    fn load_course(&self, course_id: &str) -> ServiceResult<Course> {
        self.store
            .get_course(course_id)?
            .ok_or(ServiceError::NotFound("Course"))
    }

    /// Returns the course as `viewer` is allowed to see it. Drafts are hidden
    /// from everybody but their owner and admins.
    pub fn get_course(&self, viewer: &Actor, course_id: &str) -> ServiceResult<Course> {
        let course = self.load_course(course_id)?;
        if !course.published && !viewer.can_manage(course.teacher_id) {
            return Err(ServiceError::NotFound("Course"));
        }
        Ok(course)
    }

    /// A published course, the only kind that can be enrolled in or shared.
    pub fn get_published_course(&self, course_id: &str) -> ServiceResult<Course> {
        let course = self.load_course(course_id)?;
        if !course.published {
            return Err(ServiceError::NotFound("Course"));
        }
        Ok(course)
    }

    pub fn list_courses(&self, viewer: &Actor, tag: Option<&str>) -> ServiceResult<Vec<Course>> {
        Ok(self
            .store
            .list_courses(tag)?
            .into_iter()
            .filter(|course| course.published || viewer.can_manage(course.teacher_id))
            .collect())
    }

    pub fn create_course(&self, teacher: &Actor, draft: CourseDraft) -> ServiceResult<Course> {
        validate_course_fields(
            Some(&draft.title),
            Some(&draft.description),
            Some(draft.price_cents),
            Some(&draft.tags),
            Some(&draft.lectures),
        )?;
        let now = now_secs();
        let course = Course {
            id: new_entity_id(),
            teacher_id: teacher.user_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            price_cents: draft.price_cents,
            tags: draft.tags,
            published: draft.published,
            lectures: draft.lectures,
            created: now,
            updated: now,
        };
        self.store.create_course(&course)?;
        info!(
            "User {} created course {} with {} lectures",
            teacher.user_id,
            course.id,
            course.total_lectures()
        );
        Ok(course)
    }

    pub fn update_course(
        &self,
        actor: &Actor,
        course_id: &str,
        update: CourseUpdate,
    ) -> ServiceResult<Course> {
        let mut course = self.get_course(actor, course_id)?;
        if !actor.can_manage(course.teacher_id) {
            return Err(ServiceError::forbidden("Only the course owner can edit it"));
        }
        validate_course_fields(
            update.title.as_deref(),
            update.description.as_deref(),
            update.price_cents,
            update.tags.as_deref(),
            update.lectures.as_deref(),
        )?;

        if let Some(title) = update.title {
            course.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            course.description = description;
        }
        if let Some(price_cents) = update.price_cents {
            course.price_cents = price_cents;
        }
        if let Some(tags) = update.tags {
            course.tags = tags;
        }
        if let Some(published) = update.published {
            course.published = published;
        }
        if let Some(lectures) = update.lectures {
            course.lectures = lectures;
        }
        course.updated = now_secs();

        if !self.store.update_course(&course)? {
            return Err(ServiceError::NotFound("Course"));
        }
        Ok(course)
    }

    pub fn delete_course(&self, actor: &Actor, course_id: &str) -> ServiceResult<()> {
        let course = self.get_course(actor, course_id)?;
        if !actor.can_manage(course.teacher_id) {
            return Err(ServiceError::forbidden(
                "Only the course owner can delete it",
            ));
        }
        self.store.delete_course(course_id)?;
        info!("User {} deleted course {}", actor.user_id, course_id);
        Ok(())
    }

    pub fn enroll(&self, user_id: usize, course_id: &str) -> ServiceResult<Enrollment> {
        self.get_published_course(course_id)?;
        let enrollment = Enrollment {
            user_id,
            course_id: course_id.to_string(),
            enrolled_at: now_secs(),
            current_lecture: 0,
        };
        if !self.store.add_enrollment(&enrollment)? {
            return Err(ServiceError::bad_request(
                "Already enrolled in this course",
            ));
        }
        metrics::record_enrollment();
        info!("User {} enrolled in course {}", user_id, course_id);
        Ok(enrollment)
    }

    /// Drops the enrollment. Ledger rows stay, so re-enrolling resumes where
    /// the user left off.
    pub fn unenroll(&self, user_id: usize, course_id: &str) -> ServiceResult<()> {
        if !self.store.delete_enrollment(user_id, course_id)? {
            return Err(ServiceError::NotFound("Enrollment"));
        }
        info!("User {} left course {}", user_id, course_id);
        Ok(())
    }

    fn require_enrollment(&self, user_id: usize, course_id: &str) -> ServiceResult<Enrollment> {
        self.store
            .get_enrollment(user_id, course_id)?
            .ok_or(ServiceError::NotFound("Enrollment"))
    }

    /// Loads the course behind an active enrollment and checks `lecture_index`.
    fn enrolled_lecture(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> ServiceResult<Course> {
        self.require_enrollment(user_id, course_id)?;
        let course = self.load_course(course_id)?;
        if lecture_index >= course.total_lectures() {
            return Err(ServiceError::bad_request(format!(
                "Lecture index {} is out of range, the course has {} lectures",
                lecture_index,
                course.total_lectures()
            )));
        }
        Ok(course)
    }

    pub fn record_quiz_attempt(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
        result: QuizResult,
    ) -> ServiceResult<QuizAttemptOutcome> {
        Validator::new()
            .check(
                (0..=100).contains(&result.score),
                "score",
                "must be between 0 and 100",
            )
            .finish()?;
        let course = self.enrolled_lecture(user_id, course_id, lecture_index)?;

        let attempt = QuizAttempt {
            lecture_index,
            score: result.score as u8,
            passed: result.passed,
            attempted_at: now_secs(),
        };
        self.store
            .record_quiz_attempt(user_id, course_id, &attempt, MAX_QUIZ_ATTEMPTS)?;
        metrics::record_quiz_attempt(attempt.passed);
        debug!(
            "User {} scored {} on quiz {} of {} (passed: {})",
            user_id, attempt.score, lecture_index, course_id, attempt.passed
        );

        let rows = self.store.get_lecture_progress(user_id, course_id)?;
        Ok(QuizAttemptOutcome {
            attempt,
            progress: build_progress(course.total_lectures(), &rows),
        })
    }

    pub fn complete_lecture(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> ServiceResult<CourseProgress> {
        let course = self.enrolled_lecture(user_id, course_id, lecture_index)?;
        self.store
            .mark_lecture_completed(user_id, course_id, lecture_index)?;
        let rows = self.store.get_lecture_progress(user_id, course_id)?;
        Ok(build_progress(course.total_lectures(), &rows))
    }

    pub fn set_current_lecture(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> ServiceResult<Enrollment> {
        self.enrolled_lecture(user_id, course_id, lecture_index)?;
        self.store
            .set_current_lecture(user_id, course_id, lecture_index)?;
        self.require_enrollment(user_id, course_id)
    }

    pub fn get_progress(&self, user_id: usize, course_id: &str) -> ServiceResult<CourseProgress> {
        self.require_enrollment(user_id, course_id)?;
        let course = self.load_course(course_id)?;
        let rows = self.store.get_lecture_progress(user_id, course_id)?;
        Ok(build_progress(course.total_lectures(), &rows))
    }

    pub fn quiz_history(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> ServiceResult<Vec<QuizAttempt>> {
        self.enrolled_lecture(user_id, course_id, lecture_index)?;
        Ok(self
            .store
            .get_quiz_attempts(user_id, course_id, lecture_index)?)
    }

    /// Enrollments of `user_id`, each with progress derived from the ledger.
    pub fn user_enrollments(&self, user_id: usize) -> ServiceResult<Vec<EnrollmentOverview>> {
        let mut overviews = vec![];
        for enrollment in self.store.list_user_enrollments(user_id)? {
            let Some(course) = self.store.get_course(&enrollment.course_id)? else {
                continue;
            };
            let rows = self
                .store
                .get_lecture_progress(user_id, &enrollment.course_id)?;
            let progress = build_progress(course.total_lectures(), &rows);
            overviews.push(EnrollmentOverview {
                enrollment,
                course_title: course.title,
                total_lectures: progress.total_lectures,
                completed_lectures: progress.completed_lectures,
                overall_progress: progress.overall_progress,
            });
        }
        Ok(overviews)
    }

    pub fn counts(&self) -> ServiceResult<LearningCounts> {
        Ok(self.store.count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::SqliteLearningStore;
    use crate::user::UserRole;
    use tempfile::TempDir;

    const TEACHER: Actor = Actor {
        user_id: 1,
        role: UserRole::Teacher,
    };
    const STUDENT: Actor = Actor {
        user_id: 2,
        role: UserRole::Student,
    };
    const ADMIN: Actor = Actor {
        user_id: 3,
        role: UserRole::Admin,
    };

    fn create_manager() -> (LearningManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteLearningStore::new(temp_dir.path().join("learning.db")).unwrap();
        (LearningManager::new(Arc::new(store)), temp_dir)
    }

    fn draft(lectures: usize, published: bool) -> CourseDraft {
        CourseDraft {
            title: "Intro to Rust".to_string(),
            description: "Ownership and borrowing".to_string(),
            price_cents: 0,
            tags: vec!["rust".to_string()],
            published,
            lectures: (0..lectures)
                .map(|i| Lecture {
                    title: format!("Lecture {}", i),
                    content_url: None,
                    duration_minutes: 15,
                })
                .collect(),
        }
    }

    fn pass(score: i64) -> QuizResult {
        QuizResult {
            score,
            passed: true,
        }
    }

    #[test]
    fn passing_two_of_four_quizzes_reports_half_progress() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(4, true)).unwrap();
        manager.enroll(STUDENT.user_id, &course.id).unwrap();

        manager
            .record_quiz_attempt(STUDENT.user_id, &course.id, 0, pass(90))
            .unwrap();
        let outcome = manager
            .record_quiz_attempt(STUDENT.user_id, &course.id, 2, pass(80))
            .unwrap();
        assert_eq!(outcome.progress.overall_progress, 50);

        let progress = manager.get_progress(STUDENT.user_id, &course.id).unwrap();
        assert_eq!(progress.total_lectures, 4);
        assert_eq!(progress.completed_lectures, 2);
        assert_eq!(progress.overall_progress, 50);
        assert_eq!(progress.completed_quiz_indices, vec![0, 2]);
    }

    #[test]
    fn progress_never_decreases_as_attempts_are_recorded() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(3, true)).unwrap();
        manager.enroll(STUDENT.user_id, &course.id).unwrap();

        let attempts = [
            (0, 90, true),
            (0, 20, false),
            (1, 40, false),
            (1, 75, true),
            (0, 10, false),
            (2, 100, true),
        ];
        let mut last = 0;
        for (index, score, passed) in attempts {
            let outcome = manager
                .record_quiz_attempt(STUDENT.user_id, &course.id, index, QuizResult { score, passed })
                .unwrap();
            assert!(outcome.progress.overall_progress >= last);
            last = outcome.progress.overall_progress;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn quiz_history_keeps_the_five_newest_attempts() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(1, true)).unwrap();
        manager.enroll(STUDENT.user_id, &course.id).unwrap();
        for score in [10, 20, 30, 40, 50, 60, 70] {
            manager
                .record_quiz_attempt(
                    STUDENT.user_id,
                    &course.id,
                    0,
                    QuizResult {
                        score,
                        passed: false,
                    },
                )
                .unwrap();
        }
        let history = manager.quiz_history(STUDENT.user_id, &course.id, 0).unwrap();
        assert_eq!(history.len(), MAX_QUIZ_ATTEMPTS);
        assert_eq!(history.first().unwrap().score, 70);
        assert_eq!(history.last().unwrap().score, 30);
    }

    #[test]
    fn enrolling_twice_is_rejected() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(2, true)).unwrap();
        manager.enroll(STUDENT.user_id, &course.id).unwrap();
        assert!(matches!(
            manager.enroll(STUDENT.user_id, &course.id),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn drafts_are_hidden_from_other_users() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(2, false)).unwrap();

        assert!(manager.get_course(&TEACHER, &course.id).is_ok());
        assert!(manager.get_course(&ADMIN, &course.id).is_ok());
        assert!(matches!(
            manager.get_course(&STUDENT, &course.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(manager.list_courses(&STUDENT, None).unwrap().is_empty());
        assert!(matches!(
            manager.enroll(STUDENT.user_id, &course.id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn only_owner_or_admin_edits_a_course() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(2, true)).unwrap();
        let update = CourseUpdate {
            title: Some("Advanced Rust".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager.update_course(&STUDENT, &course.id, update.clone()),
            Err(ServiceError::Forbidden(_))
        ));
        let updated = manager.update_course(&ADMIN, &course.id, update).unwrap();
        assert_eq!(updated.title, "Advanced Rust");
        assert_eq!(updated.lectures.len(), 2);

        assert!(matches!(
            manager.delete_course(&STUDENT, &course.id),
            Err(ServiceError::Forbidden(_))
        ));
        manager.delete_course(&TEACHER, &course.id).unwrap();
        assert!(matches!(
            manager.get_course(&TEACHER, &course.id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn ledger_requires_enrollment_and_valid_index() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(2, true)).unwrap();
        assert!(matches!(
            manager.complete_lecture(STUDENT.user_id, &course.id, 0),
            Err(ServiceError::NotFound("Enrollment"))
        ));
        manager.enroll(STUDENT.user_id, &course.id).unwrap();
        assert!(matches!(
            manager.complete_lecture(STUDENT.user_id, &course.id, 2),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            manager.record_quiz_attempt(STUDENT.user_id, &course.id, 0, pass(101)),
            Err(ServiceError::Validation(_))
        ));
        let enrollment = manager
            .set_current_lecture(STUDENT.user_id, &course.id, 1)
            .unwrap();
        assert_eq!(enrollment.current_lecture, 1);
    }

    #[test]
    fn progress_resumes_after_re_enrolling() {
        let (manager, _dir) = create_manager();
        let course = manager.create_course(&TEACHER, draft(2, true)).unwrap();
        manager.enroll(STUDENT.user_id, &course.id).unwrap();
        manager
            .complete_lecture(STUDENT.user_id, &course.id, 0)
            .unwrap();
        manager.unenroll(STUDENT.user_id, &course.id).unwrap();
        assert!(matches!(
            manager.unenroll(STUDENT.user_id, &course.id),
            Err(ServiceError::NotFound(_))
        ));

        manager.enroll(STUDENT.user_id, &course.id).unwrap();
        let overviews = manager.user_enrollments(STUDENT.user_id).unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].completed_lectures, 1);
        assert_eq!(overviews[0].overall_progress, 50);
        assert_eq!(overviews[0].course_title, "Intro to Rust");
    }

    #[test]
    fn rejects_invalid_course_drafts() {
        let (manager, _dir) = create_manager();
        let mut bad = draft(1, true);
        bad.title = "  ".to_string();
        bad.price_cents = -5;
        match manager.create_course(&TEACHER, bad) {
            Err(ServiceError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "priceCents"]);
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }
}
