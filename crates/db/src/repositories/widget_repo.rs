//! Repository for the `widgets` table.
//!
//! Every write is conditional on the row being live; updates are also
//! conditional on the version the caller observed. A write whose predicate
//! matches nothing returns `None` / `false` and leaves the explanation to the
//! caller (see [`WidgetRepo::find_row_state`]).

use perfolio_core::types::{DbId, WidgetId};
use perfolio_core::widgets::{NewWidget, Widget, WidgetPositionUpdate};
use sqlx::PgPool;

use crate::models::widget::{WidgetRow, WidgetRowState};

/// Column list for `widgets` queries.
const COLUMNS: &str = "\
    id, user_id, widget_type, component, x, y, w, h, settings, \
    display_name, is_visible, version, created_at, updated_at, deleted_at";

/// Result of a batch position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every entry matched and the transaction committed.
    Applied,
    /// The entry at `index` matched no live row with the asserted owner and
    /// version; the transaction was rolled back.
    Missed { index: usize },
}

/// Provides data access for widgets.
pub struct WidgetRepo;

impl WidgetRepo {
    /// Insert a widget with `version = 1` and `is_visible = true`.
    ///
    /// Returns `None` if a row with the same id already exists.
    pub async fn create(pool: &PgPool, dto: &NewWidget) -> Result<Option<WidgetRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO widgets \
                 (id, user_id, widget_type, component, x, y, w, h, settings, display_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WidgetRow>(&query)
            .bind(dto.id)
            .bind(dto.user_id)
            .bind(&dto.widget_type)
            .bind(&dto.component)
            .bind(dto.x)
            .bind(dto.y)
            .bind(dto.w)
            .bind(dto.h)
            .bind(&dto.settings)
            .bind(&dto.display_name)
            .fetch_optional(pool)
            .await
    }

    /// Find a live widget by ID.
    pub async fn find_live(pool: &PgPool, id: WidgetId) -> Result<Option<WidgetRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM widgets WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, WidgetRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a widget by ID, including soft-deleted rows.
    pub async fn find_by_id_including_deleted(
        pool: &PgPool,
        id: WidgetId,
    ) -> Result<Option<WidgetRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM widgets WHERE id = $1");
        sqlx::query_as::<_, WidgetRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's live widgets in reading order.
    pub async fn list_by_owner(pool: &PgPool, user_id: DbId) -> Result<Vec<WidgetRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM widgets \
             WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY y ASC, x ASC, created_at ASC, id ASC"
        );
        sqlx::query_as::<_, WidgetRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the mutable fields of a live widget if its version is still
    /// `expected_version`, bumping the version by one.
    ///
    /// Returns `None` if the predicate matched no row.
    pub async fn update_if_version(
        pool: &PgPool,
        widget: &Widget,
        expected_version: i32,
    ) -> Result<Option<WidgetRow>, sqlx::Error> {
        let query = format!(
            "UPDATE widgets SET \
                 widget_type  = $3, \
                 component    = $4, \
                 x            = $5, \
                 y            = $6, \
                 w            = $7, \
                 h            = $8, \
                 settings     = $9, \
                 display_name = $10, \
                 is_visible   = $11, \
                 version      = version + 1, \
                 updated_at   = NOW() \
             WHERE id = $1 AND version = $2 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WidgetRow>(&query)
            .bind(widget.id)
            .bind(expected_version)
            .bind(&widget.widget_type)
            .bind(&widget.component)
            .bind(widget.x)
            .bind(widget.y)
            .bind(widget.w)
            .bind(widget.h)
            .bind(&widget.settings)
            .bind(&widget.display_name)
            .bind(widget.is_visible)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a live widget. The version is left unchanged.
    ///
    /// Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: WidgetId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE widgets SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Owner and version of a live widget, if any.
    pub async fn find_row_state(
        pool: &PgPool,
        id: WidgetId,
    ) -> Result<Option<WidgetRowState>, sqlx::Error> {
        sqlx::query_as::<_, WidgetRowState>(
            "SELECT user_id, version FROM widgets WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Apply every position update inside one transaction.
    ///
    /// Each entry must match a live row with the asserted owner and version.
    /// The first entry that matches nothing rolls the transaction back.
    pub async fn batch_update_positions(
        pool: &PgPool,
        updates: &[WidgetPositionUpdate],
    ) -> Result<BatchOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        for (index, update) in updates.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE widgets SET \
                     x = $4, y = $5, w = $6, h = $7, \
                     version = version + 1, updated_at = NOW() \
                 WHERE id = $1 AND user_id = $2 AND version = $3 \
                   AND deleted_at IS NULL",
            )
            .bind(update.id)
            .bind(update.user_id)
            .bind(update.version)
            .bind(update.x)
            .bind(update.y)
            .bind(update.w)
            .bind(update.h)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(BatchOutcome::Missed { index });
            }
        }

        tx.commit().await?;
        Ok(BatchOutcome::Applied)
    }
}
