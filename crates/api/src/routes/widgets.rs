//! Route definitions for widget types and widgets.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::widgets;
use crate::state::AppState;

/// Widget type catalog routes mounted at `/widget-types`.
///
/// ```text
/// GET    /        -> list_widget_types
/// GET    /{type}  -> get_widget_type
/// ```
pub fn type_router() -> Router<AppState> {
    Router::new()
        .route("/", get(widgets::list_widget_types))
        .route("/{type_key}", get(widgets::get_widget_type))
}

/// Widget routes mounted at `/widgets`.
///
/// ```text
/// POST   /                  -> create_widget
/// POST   /batch-update      -> batch_update_positions
/// GET    /user/{user_id}    -> list_user_widgets
/// GET    /{id}              -> get_widget
/// PUT    /{id}              -> update_widget
/// DELETE /{id}              -> delete_widget
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(widgets::create_widget))
        .route("/batch-update", post(widgets::batch_update_positions))
        .route("/user/{user_id}", get(widgets::list_user_widgets))
        .route(
            "/{id}",
            get(widgets::get_widget)
                .put(widgets::update_widget)
                .delete(widgets::delete_widget),
        )
}
