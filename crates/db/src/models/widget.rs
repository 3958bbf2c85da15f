//! Widget rows.
//!
//! The column is named `widget_type` because `type` is reserved in SQL; the
//! domain [`Widget`] serializes it back as `type`.

use perfolio_core::types::{DbId, Timestamp, WidgetId};
use perfolio_core::widgets::Widget;
use sqlx::FromRow;

/// A row from the `widgets` table.
#[derive(Debug, Clone, FromRow)]
pub struct WidgetRow {
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
    pub is_visible: bool,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl From<WidgetRow> for Widget {
    fn from(row: WidgetRow) -> Self {
        Widget {
            id: row.id,
            user_id: row.user_id,
            widget_type: row.widget_type,
            component: row.component,
            x: row.x,
            y: row.y,
            w: row.w,
            h: row.h,
            settings: row.settings,
            display_name: row.display_name,
            is_visible: row.is_visible,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Owner and version of a live row, used to explain a missed conditional write.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct WidgetRowState {
    pub user_id: DbId,
    pub version: i32,
}
