use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skillwise_server::community::{CommunityStore, SqliteCommunityStore};
use skillwise_server::config;
use skillwise_server::learning::{LearningStore, SqliteLearningStore};
use skillwise_server::marketplace::{MarketplaceStore, SqliteMarketplaceStore};
use skillwise_server::notifications::Notifier;
use skillwise_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use skillwise_server::user::{FullUserStore, SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing database files (user.db, learning.db, community.db,
    /// marketplace.db). Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Auth tokens unused for this many days are pruned. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub token_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if token_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            token_retention_days: args.token_retention_days,
            prune_interval_hours: args.prune_interval_hours,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!(
        "  min_unsupervised_age: {}",
        app_config.family.min_unsupervised_age
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    // Stores create their database if it does not exist yet
    for path in [
        app_config.user_db_path(),
        app_config.learning_db_path(),
        app_config.community_db_path(),
        app_config.marketplace_db_path(),
    ] {
        if !path.exists() {
            info!("Creating new database at {:?}", path);
        }
    }
    let user_store: Arc<dyn FullUserStore> =
        Arc::new(SqliteUserStore::new(app_config.user_db_path())?);
    let learning_store: Arc<dyn LearningStore> =
        Arc::new(SqliteLearningStore::new(app_config.learning_db_path())?);
    let community_store: Arc<dyn CommunityStore> =
        Arc::new(SqliteCommunityStore::new(app_config.community_db_path())?);
    let marketplace_store: Arc<dyn MarketplaceStore> =
        Arc::new(SqliteMarketplaceStore::new(app_config.marketplace_db_path())?);

    // Spawn background task for auth token pruning if enabled
    if app_config.token_retention_days > 0 {
        let retention_days = app_config.token_retention_days;
        let interval_hours = app_config.prune_interval_hours.max(1);
        let pruning_manager = UserManager::new(
            user_store.clone(),
            Notifier::new(user_store.clone()),
            app_config.family.min_unsupervised_age,
        );

        info!(
            "Token pruning enabled: retaining {} days, pruning every {} hours",
            retention_days, interval_hours
        );

        tokio::spawn(async move {
            let interval = Duration::from_secs(interval_hours * 60 * 60);
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;

                match pruning_manager.prune_unused_auth_tokens(retention_days) {
                    Ok(count) => {
                        if count > 0 {
                            info!("Pruned {} unused auth tokens", count);
                        }
                    }
                    Err(e) => {
                        error!("Failed to prune auth tokens: {}", e);
                    }
                }
            }
        });
    }

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        feed_page_size: app_config.community.feed_page_size,
        max_post_length: app_config.community.max_post_length,
        min_unsupervised_age: app_config.family.min_unsupervised_age,
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    tokio::select! {
        result = run_server(
            server_config,
            app_config.metrics_port,
            user_store,
            learning_store,
            community_store,
            marketplace_store,
        ) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
