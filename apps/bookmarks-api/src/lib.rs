pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use auth::identity::IdentityProvider;
use config::Config;
use db::kv::KeyValueStore;
use db::pool::DbPool;
use gateway::fanout::ChangeBroadcast;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub kv: Arc<dyn KeyValueStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
    pub broadcast: Arc<ChangeBroadcast>,
}
