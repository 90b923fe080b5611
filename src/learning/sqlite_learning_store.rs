use crate::sqlite_column;
use crate::sqlite_persistence::{
    now_secs, open_versioned_db, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

use super::learning_store::LearningStore;
use super::models::{Course, Enrollment, LearningCounts, Lecture, LectureProgress, QuizAttempt};

const COURSE_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "course",
    foreign_column: "id",
    cascade_on_delete: true,
};

/// V 0
const COURSE_TABLE_V_0: Table = Table {
    name: "course",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("teacher_id", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!(
            "price_cents",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("tags", &SqlType::Text, non_null = true),
        sqlite_column!(
            "published",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_course_teacher_id", "teacher_id")],
};
const LECTURE_TABLE_V_0: Table = Table {
    name: "lecture",
    columns: &[
        sqlite_column!(
            "course_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&COURSE_FOREIGN_KEY)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("content_url", &SqlType::Text),
        sqlite_column!(
            "duration_minutes",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    unique_constraints: &[&["course_id", "position"]],
    indices: &[],
};
const ENROLLMENT_TABLE_V_0: Table = Table {
    name: "enrollment",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "course_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&COURSE_FOREIGN_KEY)
        ),
        sqlite_column!("enrolled_at", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "current_lecture",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    unique_constraints: &[&["user_id", "course_id"]],
    indices: &[("idx_enrollment_user_id", "user_id")],
};
/// The progress ledger. Rows are created lazily and outlive enrollments.
const LECTURE_PROGRESS_TABLE_V_0: Table = Table {
    name: "lecture_progress",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "course_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&COURSE_FOREIGN_KEY)
        ),
        sqlite_column!("lecture_index", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "lecture_completed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "quiz_passed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "course_id", "lecture_index"]],
    indices: &[],
};
const QUIZ_ATTEMPT_TABLE_V_0: Table = Table {
    name: "quiz_attempt",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "course_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&COURSE_FOREIGN_KEY)
        ),
        sqlite_column!("lecture_index", &SqlType::Integer, non_null = true),
        sqlite_column!("score", &SqlType::Integer, non_null = true),
        sqlite_column!("passed", &SqlType::Integer, non_null = true),
        sqlite_column!("attempted_at", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[(
        "idx_quiz_attempt_key",
        "user_id, course_id, lecture_index",
    )],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        COURSE_TABLE_V_0,
        LECTURE_TABLE_V_0,
        ENROLLMENT_TABLE_V_0,
        LECTURE_PROGRESS_TABLE_V_0,
        QUIZ_ATTEMPT_TABLE_V_0,
    ],
    migration: None,
}];

const COURSE_COLUMNS: &str =
    "id, teacher_id, title, description, price_cents, tags, published, created, updated";

fn course_from_row(row: &Row) -> rusqlite::Result<Course> {
    let tags: String = row.get(5)?;
    Ok(Course {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price_cents: row.get(4)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        published: row.get(6)?,
        lectures: vec![],
        created: row.get(7)?,
        updated: row.get(8)?,
    })
}

fn enrollment_from_row(row: &Row) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        user_id: row.get(0)?,
        course_id: row.get(1)?,
        enrolled_at: row.get(2)?,
        current_lecture: row.get(3)?,
    })
}

fn load_lectures(conn: &Connection, course_id: &str) -> Result<Vec<Lecture>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT title, content_url, duration_minutes FROM {} WHERE course_id = ?1 ORDER BY position",
        LECTURE_TABLE_V_0.name
    ))?;
    let lectures = stmt
        .query_map(params![course_id], |row| {
            Ok(Lecture {
                title: row.get(0)?,
                content_url: row.get(1)?,
                duration_minutes: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lectures)
}

fn insert_lectures(tx: &Transaction, course: &Course) -> Result<()> {
    for (position, lecture) in course.lectures.iter().enumerate() {
        tx.execute(
            &format!(
                "INSERT INTO {} (course_id, position, title, content_url, duration_minutes) VALUES (?1, ?2, ?3, ?4, ?5)",
                LECTURE_TABLE_V_0.name
            ),
            params![
                course.id,
                position,
                lecture.title,
                lecture.content_url,
                lecture.duration_minutes
            ],
        )?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct SqliteLearningStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLearningStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteLearningStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl LearningStore for SqliteLearningStore {
    fn create_course(&self, course: &Course) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                COURSE_TABLE_V_0.name, COURSE_COLUMNS
            ),
            params![
                course.id,
                course.teacher_id,
                course.title,
                course.description,
                course.price_cents,
                serde_json::to_string(&course.tags)?,
                course.published,
                course.created,
                course.updated,
            ],
        )
        .with_context(|| format!("Failed to create course {}", course.id))?;
        insert_lectures(&tx, course)?;
        tx.commit()?;
        Ok(())
    }

    fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        let conn = self.conn.lock().unwrap();
        let course = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    COURSE_COLUMNS, COURSE_TABLE_V_0.name
                ),
                params![course_id],
                course_from_row,
            )
            .optional()?;
        match course {
            Some(mut course) => {
                course.lectures = load_lectures(&conn, &course.id)?;
                Ok(Some(course))
            }
            None => Ok(None),
        }
    }

    fn list_courses(&self, tag: Option<&str>) -> Result<Vec<Course>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY created DESC, rowid DESC",
            COURSE_COLUMNS, COURSE_TABLE_V_0.name
        ))?;
        let courses = stmt
            .query_map([], course_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(courses.len());
        for mut course in courses {
            if let Some(tag) = tag {
                if !course.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                    continue;
                }
            }
            course.lectures = load_lectures(&conn, &course.id)?;
            result.push(course);
        }
        Ok(result)
    }

    fn update_course(&self, course: &Course) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let updated = tx.execute(
            &format!(
                "UPDATE {} SET title = ?1, description = ?2, price_cents = ?3, tags = ?4, published = ?5, updated = ?6 WHERE id = ?7",
                COURSE_TABLE_V_0.name
            ),
            params![
                course.title,
                course.description,
                course.price_cents,
                serde_json::to_string(&course.tags)?,
                course.published,
                course.updated,
                course.id,
            ],
        )?;
        if updated == 0 {
            return Ok(false);
        }
        tx.execute(
            &format!("DELETE FROM {} WHERE course_id = ?1", LECTURE_TABLE_V_0.name),
            params![course.id],
        )?;
        insert_lectures(&tx, course)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete_course(&self, course_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", COURSE_TABLE_V_0.name),
            params![course_id],
        )?;
        Ok(deleted > 0)
    }

    fn add_enrollment(&self, enrollment: &Enrollment) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, course_id, enrolled_at, current_lecture) VALUES (?1, ?2, ?3, ?4)",
                ENROLLMENT_TABLE_V_0.name
            ),
            params![
                enrollment.user_id,
                enrollment.course_id,
                enrollment.enrolled_at,
                enrollment.current_lecture
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_enrollment(&self, user_id: usize, course_id: &str) -> Result<Option<Enrollment>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT user_id, course_id, enrolled_at, current_lecture FROM {} WHERE user_id = ?1 AND course_id = ?2",
                    ENROLLMENT_TABLE_V_0.name
                ),
                params![user_id, course_id],
                enrollment_from_row,
            )
            .optional()?)
    }

    fn delete_enrollment(&self, user_id: usize, course_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND course_id = ?2",
                ENROLLMENT_TABLE_V_0.name
            ),
            params![user_id, course_id],
        )?;
        Ok(deleted > 0)
    }

    fn list_user_enrollments(&self, user_id: usize) -> Result<Vec<Enrollment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT user_id, course_id, enrolled_at, current_lecture FROM {} WHERE user_id = ?1 ORDER BY enrolled_at DESC, rowid DESC",
            ENROLLMENT_TABLE_V_0.name
        ))?;
        let enrollments = stmt
            .query_map(params![user_id], enrollment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(enrollments)
    }

    fn set_current_lecture(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET current_lecture = ?1 WHERE user_id = ?2 AND course_id = ?3",
                ENROLLMENT_TABLE_V_0.name
            ),
            params![lecture_index, user_id, course_id],
        )?;
        Ok(updated > 0)
    }

    fn record_quiz_attempt(
        &self,
        user_id: usize,
        course_id: &str,
        attempt: &QuizAttempt,
        max_attempts: usize,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO {} (user_id, course_id, lecture_index, score, passed, attempted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                QUIZ_ATTEMPT_TABLE_V_0.name
            ),
            params![
                user_id,
                course_id,
                attempt.lecture_index,
                attempt.score,
                attempt.passed,
                attempt.attempted_at
            ],
        )?;
        let evicted = tx.execute(
            &format!(
                "DELETE FROM {table} WHERE user_id = ?1 AND course_id = ?2 AND lecture_index = ?3 AND id NOT IN (
                    SELECT id FROM {table} WHERE user_id = ?1 AND course_id = ?2 AND lecture_index = ?3 ORDER BY id DESC LIMIT ?4
                )",
                table = QUIZ_ATTEMPT_TABLE_V_0.name
            ),
            params![user_id, course_id, attempt.lecture_index, max_attempts],
        )?;
        if evicted > 0 {
            debug!(
                "Evicted {} old quiz attempts of user {} on {}#{}",
                evicted, user_id, course_id, attempt.lecture_index
            );
        }

        if attempt.passed {
            tx.execute(
                &format!(
                    "INSERT INTO {} (user_id, course_id, lecture_index, lecture_completed, quiz_passed, updated) VALUES (?1, ?2, ?3, 1, 1, ?4)
                     ON CONFLICT(user_id, course_id, lecture_index) DO UPDATE SET lecture_completed = 1, quiz_passed = 1, updated = excluded.updated",
                    LECTURE_PROGRESS_TABLE_V_0.name
                ),
                params![user_id, course_id, attempt.lecture_index, attempt.attempted_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn mark_lecture_completed(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, course_id, lecture_index, lecture_completed, updated) VALUES (?1, ?2, ?3, 1, ?4)
                 ON CONFLICT(user_id, course_id, lecture_index) DO UPDATE SET lecture_completed = 1, updated = excluded.updated",
                LECTURE_PROGRESS_TABLE_V_0.name
            ),
            params![user_id, course_id, lecture_index, now_secs()],
        )?;
        Ok(())
    }

    fn get_lecture_progress(
        &self,
        user_id: usize,
        course_id: &str,
    ) -> Result<Vec<LectureProgress>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT lecture_index, lecture_completed, quiz_passed FROM {} WHERE user_id = ?1 AND course_id = ?2 ORDER BY lecture_index",
            LECTURE_PROGRESS_TABLE_V_0.name
        ))?;
        let rows = stmt
            .query_map(params![user_id, course_id], |row| {
                Ok(LectureProgress {
                    lecture_index: row.get(0)?,
                    lecture_completed: row.get(1)?,
                    quiz_passed: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_quiz_attempts(
        &self,
        user_id: usize,
        course_id: &str,
        lecture_index: usize,
    ) -> Result<Vec<QuizAttempt>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT lecture_index, score, passed, attempted_at FROM {} WHERE user_id = ?1 AND course_id = ?2 AND lecture_index = ?3 ORDER BY id DESC",
            QUIZ_ATTEMPT_TABLE_V_0.name
        ))?;
        let attempts = stmt
            .query_map(params![user_id, course_id, lecture_index], |row| {
                Ok(QuizAttempt {
                    lecture_index: row.get(0)?,
                    score: row.get(1)?,
                    passed: row.get(2)?,
                    attempted_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attempts)
    }

    fn count(&self) -> Result<LearningCounts> {
        let conn = self.conn.lock().unwrap();
        let count = |sql: String| -> Result<usize> {
            Ok(conn.query_row(&sql, [], |row| row.get::<usize, i64>(0))? as usize)
        };
        Ok(LearningCounts {
            courses: count(format!("SELECT COUNT(*) FROM {}", COURSE_TABLE_V_0.name))?,
            published_courses: count(format!(
                "SELECT COUNT(*) FROM {} WHERE published = 1",
                COURSE_TABLE_V_0.name
            ))?,
            enrollments: count(format!("SELECT COUNT(*) FROM {}", ENROLLMENT_TABLE_V_0.name))?,
            quiz_attempts: count(format!(
                "SELECT COUNT(*) FROM {}",
                QUIZ_ATTEMPT_TABLE_V_0.name
            ))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteLearningStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteLearningStore::new(temp_dir.path().join("learning.db")).unwrap();
        (store, temp_dir)
    }

    fn course(id: &str, lectures: usize, tags: &[&str]) -> Course {
        Course {
            id: id.to_string(),
            teacher_id: 1,
            title: format!("Course {}", id),
            description: String::new(),
            price_cents: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            published: true,
            lectures: (0..lectures)
                .map(|i| Lecture {
                    title: format!("Lecture {}", i),
                    content_url: None,
                    duration_minutes: 10,
                })
                .collect(),
            created: now_secs(),
            updated: now_secs(),
        }
    }

    fn attempt(lecture_index: usize, score: u8, passed: bool) -> QuizAttempt {
        QuizAttempt {
            lecture_index,
            score,
            passed,
            attempted_at: now_secs(),
        }
    }

    #[test]
    fn course_crud_keeps_lecture_order() {
        let (store, _dir) = create_tmp_store();
        let mut c = course("c1", 3, &["Rust"]);
        store.create_course(&c).unwrap();

        let loaded = store.get_course("c1").unwrap().unwrap();
        assert_eq!(loaded.lectures.len(), 3);
        assert_eq!(loaded.lectures[2].title, "Lecture 2");
        assert_eq!(loaded.tags, vec!["Rust"]);

        c.lectures.reverse();
        c.title = "Renamed".to_string();
        assert!(store.update_course(&c).unwrap());
        let loaded = store.get_course("c1").unwrap().unwrap();
        assert_eq!(loaded.title, "Renamed");
        assert_eq!(loaded.lectures[0].title, "Lecture 2");

        assert_eq!(store.list_courses(Some("rust")).unwrap().len(), 1);
        assert!(store.list_courses(Some("go")).unwrap().is_empty());

        assert!(store.delete_course("c1").unwrap());
        assert!(store.get_course("c1").unwrap().is_none());
        assert!(!store.update_course(&c).unwrap());
    }

    #[test]
    fn enrollment_is_unique_per_user_and_course() {
        let (store, _dir) = create_tmp_store();
        store.create_course(&course("c1", 2, &[])).unwrap();
        let enrollment = Enrollment {
            user_id: 7,
            course_id: "c1".to_string(),
            enrolled_at: now_secs(),
            current_lecture: 0,
        };
        assert!(store.add_enrollment(&enrollment).unwrap());
        assert!(!store.add_enrollment(&enrollment).unwrap());

        assert!(store.set_current_lecture(7, "c1", 1).unwrap());
        assert_eq!(
            store.get_enrollment(7, "c1").unwrap().unwrap().current_lecture,
            1
        );
        assert_eq!(store.list_user_enrollments(7).unwrap().len(), 1);
        assert!(store.delete_enrollment(7, "c1").unwrap());
        assert!(store.get_enrollment(7, "c1").unwrap().is_none());
    }

    #[test]
    fn quiz_history_is_capped_oldest_first() {
        let (store, _dir) = create_tmp_store();
        store.create_course(&course("c1", 2, &[])).unwrap();
        for score in 0..8u8 {
            store
                .record_quiz_attempt(7, "c1", &attempt(0, score * 10, false), 5)
                .unwrap();
        }
        let history = store.get_quiz_attempts(7, "c1", 0).unwrap();
        assert_eq!(history.len(), 5);
        let scores: Vec<u8> = history.iter().map(|a| a.score).collect();
        assert_eq!(scores, vec![70, 60, 50, 40, 30]);

        // Other lectures keep their own history.
        store
            .record_quiz_attempt(7, "c1", &attempt(1, 90, true), 5)
            .unwrap();
        assert_eq!(store.get_quiz_attempts(7, "c1", 1).unwrap().len(), 1);
        assert_eq!(store.get_quiz_attempts(7, "c1", 0).unwrap().len(), 5);
    }

    #[test]
    fn passing_attempt_marks_quiz_and_lecture() {
        let (store, _dir) = create_tmp_store();
        store.create_course(&course("c1", 4, &[])).unwrap();
        store
            .record_quiz_attempt(7, "c1", &attempt(0, 40, false), 5)
            .unwrap();
        assert!(store.get_lecture_progress(7, "c1").unwrap().is_empty());

        store
            .record_quiz_attempt(7, "c1", &attempt(0, 90, true), 5)
            .unwrap();
        store.mark_lecture_completed(7, "c1", 3).unwrap();
        store.mark_lecture_completed(7, "c1", 3).unwrap();

        let rows = store.get_lecture_progress(7, "c1").unwrap();
        assert_eq!(
            rows,
            vec![
                LectureProgress {
                    lecture_index: 0,
                    lecture_completed: true,
                    quiz_passed: true
                },
                LectureProgress {
                    lecture_index: 3,
                    lecture_completed: true,
                    quiz_passed: false
                },
            ]
        );
    }

    #[test]
    fn ledger_survives_unenrollment() {
        let (store, _dir) = create_tmp_store();
        store.create_course(&course("c1", 2, &[])).unwrap();
        store
            .add_enrollment(&Enrollment {
                user_id: 7,
                course_id: "c1".to_string(),
                enrolled_at: now_secs(),
                current_lecture: 0,
            })
            .unwrap();
        store.mark_lecture_completed(7, "c1", 0).unwrap();
        store.delete_enrollment(7, "c1").unwrap();
        assert_eq!(store.get_lecture_progress(7, "c1").unwrap().len(), 1);

        let counts = store.count().unwrap();
        assert_eq!(counts.courses, 1);
        assert_eq!(counts.enrollments, 0);
    }
}
