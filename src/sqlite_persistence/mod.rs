mod versioned_schema;

pub use versioned_schema::*;

/// Current unix time in seconds, the timestamp unit of every SkillWise table.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Generates an opaque entity id (courses, posts, listings, notifications).
pub fn new_entity_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
