mod learning_manager;
mod learning_store;
pub mod models;
pub mod progress;
mod sqlite_learning_store;

pub use learning_manager::LearningManager;
pub use learning_store::LearningStore;
pub use models::{
    Course, CourseDraft, CourseProgress, CourseUpdate, Enrollment, EnrollmentOverview,
    LearningCounts, Lecture, LectureProgress, QuizAttempt, QuizAttemptOutcome, QuizResult,
};
pub use sqlite_learning_store::SqliteLearningStore;
