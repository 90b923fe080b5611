//! Shared constants for end-to-end tests
//!
//! When test users change, update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Student account
pub const STUDENT_USER: &str = "student";
pub const STUDENT_PASS: &str = "studentpass123";

/// Second student, used as the "other" side of social interactions
pub const FRIEND_USER: &str = "friend";
pub const FRIEND_PASS: &str = "friendpass123";

/// Teacher account, owns the seeded courses
pub const TEACHER_USER: &str = "teacher";
pub const TEACHER_PASS: &str = "teacherpass123";

/// Parent account
pub const PARENT_USER: &str = "parent";
pub const PARENT_PASS: &str = "parentpass123";

/// Child account with no birth year, so it starts unblocked
pub const CHILD_USER: &str = "child";
pub const CHILD_PASS: &str = "childpass123";

/// Admin account
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
