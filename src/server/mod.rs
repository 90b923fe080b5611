mod account_routes;
mod admin_routes;
mod community_routes;
pub mod config;
mod family_routes;
mod friends_routes;
mod http_layers;
mod learning_routes;
mod marketplace_routes;
pub mod metrics;
mod notification_routes;
mod response;
pub mod server;
pub(self) mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::{make_app, run_server};
