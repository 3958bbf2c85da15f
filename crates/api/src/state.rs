use std::sync::Arc;

use perfolio_core::widgets::WidgetEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly only by the health check.
    pub pool: perfolio_db::DbPool,
    /// Server configuration (read by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// Widget layout engine; every widget route goes through it.
    pub engine: Arc<WidgetEngine>,
}
