use super::RequestsLoggingLevel;
use crate::config::{DEFAULT_FEED_PAGE_SIZE, DEFAULT_MIN_UNSUPERVISED_AGE};
use crate::community::DEFAULT_MAX_POST_LENGTH;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Page size of feed listings when the client does not pass a limit.
    pub feed_page_size: usize,
    pub max_post_length: usize,
    pub min_unsupervised_age: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
            max_post_length: DEFAULT_MAX_POST_LENGTH,
            min_unsupervised_age: DEFAULT_MIN_UNSUPERVISED_AGE,
        }
    }
}
