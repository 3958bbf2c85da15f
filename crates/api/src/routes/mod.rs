pub mod health;
pub mod widgets;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /widget-types                  list registered widget types
/// /widget-types/{type}           describe one widget type
///
/// /widgets                       create (auth)
/// /widgets/batch-update          atomic batch position update (auth)
/// /widgets/user/{user_id}        list a user's widgets
/// /widgets/{id}                  get, update (auth), delete (auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/widget-types", widgets::type_router())
        .nest("/widgets", widgets::router())
}
