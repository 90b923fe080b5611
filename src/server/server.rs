use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;

use super::account_routes::{auth_routes, user_routes};
use super::admin_routes::admin_routes;
use super::community_routes::community_routes;
use super::family_routes::family_routes;
use super::friends_routes::friends_routes;
use super::learning_routes::learning_routes;
use super::marketplace_routes::marketplace_routes;
use super::metrics::metrics_handler;
use super::notification_routes::notification_routes;
#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{log_requests, session::Session, state::ServerState, ServerConfig};
use crate::community::CommunityStore;
use crate::learning::LearningStore;
use crate::marketplace::MarketplaceStore;
use crate::user::FullUserStore;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStats {
    pub uptime: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    user_store: Arc<dyn FullUserStore>,
    learning_store: Arc<dyn LearningStore>,
    community_store: Arc<dyn CommunityStore>,
    marketplace_store: Arc<dyn MarketplaceStore>,
) -> Result<Router> {
    let state = ServerState::new(
        config.clone(),
        user_store,
        learning_store,
        community_store,
        marketplace_store,
    );

    let api_routes: Router<ServerState> = Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/learning", learning_routes())
        .nest("/community", community_routes())
        .nest("/friends", friends_routes())
        .nest("/family", family_routes())
        .nest("/notifications", notification_routes())
        .nest("/marketplace", marketplace_routes())
        .nest("/admin", admin_routes());

    let home_router: Router<ServerState> = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)),
    };

    let mut app: Router = home_router
        .nest("/api", api_routes)
        .with_state(state.clone());

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    user_store: Arc<dyn FullUserStore>,
    learning_store: Arc<dyn LearningStore>,
    community_store: Arc<dyn CommunityStore>,
    marketplace_store: Arc<dyn MarketplaceStore>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(
        config,
        user_store,
        learning_store,
        community_store,
        marketplace_store,
    )?;

    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            tracing::error!("Metrics server stopped: {}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
