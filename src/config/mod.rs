mod file_config;

pub use file_config::{CommunityConfig, FamilyConfig, FileConfig};

use crate::community::DEFAULT_MAX_POST_LENGTH;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_MIN_UNSUPERVISED_AGE: u32 = 13;
pub const DEFAULT_FEED_PAGE_SIZE: usize = 20;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub token_retention_days: u64,
    pub prune_interval_hours: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub token_retention_days: u64,
    pub prune_interval_hours: u64,

    // Feature configs (with defaults)
    pub family: FamilySettings,
    pub community: CommunitySettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySettings {
    pub min_unsupervised_age: u32,
}

impl Default for FamilySettings {
    fn default() -> Self {
        Self {
            min_unsupervised_age: DEFAULT_MIN_UNSUPERVISED_AGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunitySettings {
    pub feed_page_size: usize,
    pub max_post_length: usize,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
            max_post_length: DEFAULT_MAX_POST_LENGTH,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let token_retention_days = file
            .token_retention_days
            .unwrap_or(cli.token_retention_days);
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);

        let family_file = file.family.unwrap_or_default();
        let family = FamilySettings {
            min_unsupervised_age: family_file
                .min_unsupervised_age
                .unwrap_or(DEFAULT_MIN_UNSUPERVISED_AGE),
        };

        let community_file = file.community.unwrap_or_default();
        let community = CommunitySettings {
            feed_page_size: community_file
                .feed_page_size
                .unwrap_or(DEFAULT_FEED_PAGE_SIZE),
            max_post_length: community_file
                .max_post_length
                .unwrap_or(DEFAULT_MAX_POST_LENGTH),
        };
        if community.feed_page_size == 0 {
            bail!("community.feed_page_size must be greater than zero");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            token_retention_days,
            prune_interval_hours,
            family,
            community,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn learning_db_path(&self) -> PathBuf {
        self.db_dir.join("learning.db")
    }

    pub fn community_db_path(&self) -> PathBuf {
        self.db_dir.join("community.db")
    }

    pub fn marketplace_db_path(&self) -> PathBuf {
        self.db_dir.join("marketplace.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("body"),
            Some(RequestsLoggingLevel::Body)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            frontend_dir_path: Some("/frontend".to_string()),
            token_retention_days: 60,
            prune_interval_hours: 12,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.token_retention_days, 60);
        assert_eq!(config.prune_interval_hours, 12);
        assert_eq!(config.family, FamilySettings::default());
        assert_eq!(config.community.feed_page_size, DEFAULT_FEED_PAGE_SIZE);
        assert_eq!(config.community.max_post_length, 5000);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            family: Some(FamilyConfig {
                min_unsupervised_age: Some(16),
            }),
            community: Some(CommunityConfig {
                feed_page_size: Some(5),
                max_post_length: None,
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.family.min_unsupervised_age, 16);
        assert_eq!(config.community.feed_page_size, 5);
        assert_eq!(config.community.max_post_length, DEFAULT_MAX_POST_LENGTH);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_rejects_empty_feed_pages() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let file_config = FileConfig {
            community: Some(CommunityConfig {
                feed_page_size: Some(0),
                max_post_length: None,
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(file_config)).is_err());
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.user_db_path(), temp_dir.path().join("user.db"));
        assert_eq!(config.learning_db_path(), temp_dir.path().join("learning.db"));
        assert_eq!(config.community_db_path(), temp_dir.path().join("community.db"));
        assert_eq!(
            config.marketplace_db_path(),
            temp_dir.path().join("marketplace.db")
        );
    }
}
