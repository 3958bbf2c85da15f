//! Widget entity and request payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{DbId, Timestamp, WidgetId};

/// Widest a widget may be on the 12-column grid.
pub const GRID_COLUMNS: i32 = 12;

/// A positioned, typed panel on a user's profile layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub user_id: DbId,
    #[serde(rename = "type")]
    pub widget_type: String,
    pub component: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub settings: Option<serde_json::Value>,
    pub display_name: Option<String>,
    pub is_visible: bool,
    /// Starts at 1 and grows by exactly 1 on every successful mutation.
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

/// A fully resolved widget ready to be inserted.
///
/// The store assigns `version = 1`, `is_visible = true` and timestamps.
#[derive(Debug, Clone)]
pub struct NewWidget {
    pub id: WidgetId,
    pub user_id: DbId,
    pub widget_type: String,
    pub component: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub settings: Option<serde_json::Value>,
    pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for creating a widget.
///
/// `component`, `w` and `h` fall back to the type's defaults when omitted;
/// absent `settings` are replaced by the type's default settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWidget {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub widget_type: String,
    pub component: Option<String>,
    #[validate(range(min = 0))]
    pub x: i32,
    #[validate(range(min = 0))]
    pub y: i32,
    #[validate(range(min = 1, max = 12))]
    pub w: Option<i32>,
    #[validate(range(min = 1))]
    pub h: Option<i32>,
    pub settings: Option<serde_json::Value>,
    pub display_name: Option<String>,
}

/// DTO for partially updating a widget.
///
/// Only fields present in the request are applied. `version` is the version
/// the caller last observed; it is mandatory, a missing value is rejected
/// rather than treated as a forced overwrite.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWidget {
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub component: Option<String>,
    #[validate(range(min = 0))]
    pub x: Option<i32>,
    #[validate(range(min = 0))]
    pub y: Option<i32>,
    #[validate(range(min = 1, max = 12))]
    pub w: Option<i32>,
    #[validate(range(min = 1))]
    pub h: Option<i32>,
    pub settings: Option<serde_json::Value>,
    pub display_name: Option<String>,
    pub is_visible: Option<bool>,
    #[validate(range(min = 1))]
    pub version: Option<i32>,
}

/// One entry of a batch position update. Consumed once, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WidgetPositionUpdate {
    pub id: WidgetId,
    /// The owner the caller asserts; must match the authenticated caller.
    pub user_id: DbId,
    #[validate(range(min = 0))]
    pub x: i32,
    #[validate(range(min = 0))]
    pub y: i32,
    #[validate(range(min = 1, max = 12))]
    pub w: i32,
    #[validate(range(min = 1))]
    pub h: i32,
    /// The version the caller last observed.
    #[validate(range(min = 1))]
    pub version: i32,
}

/// DTO for an atomic multi-widget reposition (drag-and-drop).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchUpdateWidgets {
    #[validate(length(min = 1, message = "updates must not be empty"))]
    pub updates: Vec<WidgetPositionUpdate>,
}
