//! Handlers for the widget layout endpoints.
//!
//! Reads are public so profiles can be viewed by anyone; mutations require
//! an authenticated caller, who must own the widgets being changed. All
//! domain rules live in [`WidgetEngine`](perfolio_core::widgets::WidgetEngine);
//! handlers only translate between HTTP and the engine.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use perfolio_core::types::{DbId, WidgetId};
use perfolio_core::widgets::{
    BatchUpdateWidgets, CreateWidget, UpdateWidget, WidgetTypeDescriptor,
};
use serde::Serialize;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result payload of a successful batch position update.
#[derive(Debug, Serialize)]
pub struct BatchUpdateResult {
    pub updated: usize,
}

// ---------------------------------------------------------------------------
// Widget types
// ---------------------------------------------------------------------------

/// GET /api/v1/widget-types
pub async fn list_widget_types(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let types: Vec<WidgetTypeDescriptor> =
        state.engine.widget_types().into_iter().cloned().collect();
    Ok(Json(DataResponse { data: types }))
}

/// GET /api/v1/widget-types/{type}
pub async fn get_widget_type(
    State(state): State<AppState>,
    AppPath(type_key): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    let descriptor = state.engine.widget_type(&type_key)?.clone();
    Ok(Json(DataResponse { data: descriptor }))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/widgets/{id}
pub async fn get_widget(
    State(state): State<AppState>,
    AppPath(widget_id): AppPath<WidgetId>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!(%widget_id, "Getting widget by ID");
    let widget = state.engine.get_widget(widget_id).await?;
    Ok(Json(DataResponse { data: widget }))
}

/// GET /api/v1/widgets/user/{user_id}
///
/// The user's live widgets in reading order (top to bottom, left to right).
pub async fn list_user_widgets(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!(user_id, "Getting user widgets");
    let widgets = state.engine.list_user_widgets(user_id).await?;
    Ok(Json(DataResponse { data: widgets }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/widgets
pub async fn create_widget(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateWidget>,
) -> AppResult<impl IntoResponse> {
    let widget = state.engine.create_widget(user.user_id, input).await?;

    tracing::info!(
        widget_id = %widget.id,
        user_id = user.user_id,
        widget_type = %widget.widget_type,
        "Widget created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: widget })))
}

/// PUT /api/v1/widgets/{id}
///
/// Partial update; the body must carry the `version` the client last saw.
pub async fn update_widget(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(widget_id): AppPath<WidgetId>,
    AppJson(input): AppJson<UpdateWidget>,
) -> AppResult<impl IntoResponse> {
    let widget = state
        .engine
        .update_widget(user.user_id, widget_id, input)
        .await?;

    tracing::info!(
        %widget_id,
        user_id = user.user_id,
        version = widget.version,
        "Widget updated",
    );

    Ok(Json(DataResponse { data: widget }))
}

/// DELETE /api/v1/widgets/{id}
pub async fn delete_widget(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(widget_id): AppPath<WidgetId>,
) -> AppResult<impl IntoResponse> {
    state.engine.delete_widget(user.user_id, widget_id).await?;

    tracing::info!(%widget_id, user_id = user.user_id, "Widget deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/widgets/batch-update
///
/// Repositions several widgets atomically: either every entry is applied or
/// none is.
pub async fn batch_update_positions(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<BatchUpdateWidgets>,
) -> AppResult<impl IntoResponse> {
    let updated = input.updates.len();
    tracing::debug!(user_id = user.user_id, update_count = updated, "Batch updating widgets");

    state
        .engine
        .batch_update_positions(user.user_id, input)
        .await?;

    tracing::info!(user_id = user.user_id, updated, "Widget positions updated");

    Ok(Json(DataResponse {
        data: BatchUpdateResult { updated },
    }))
}
