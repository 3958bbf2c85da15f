//! PostgreSQL implementations of the core storage seams.
//!
//! Raw `sqlx::Error`s never leave this module: they are boxed into
//! [`StoreError::Backend`] (or [`CoreError::Internal`]) after being logged.

use async_trait::async_trait;
use perfolio_core::error::CoreError;
use perfolio_core::types::{DbId, WidgetId};
use perfolio_core::widgets::store::{classify_miss, RowState};
use perfolio_core::widgets::{
    NewWidget, StoreError, UserDirectory, Widget, WidgetPositionUpdate, WidgetStore,
};

use crate::repositories::{BatchOutcome, UserRepo, WidgetRepo};
use crate::DbPool;

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Widget store query failed");
    StoreError::Backend(Box::new(err))
}

/// [`WidgetStore`] over the `widgets` table.
#[derive(Clone)]
pub struct PgWidgetStore {
    pool: DbPool,
}

impl PgWidgetStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// One read after a missed conditional write, to report why it missed.
    async fn explain_miss(
        &self,
        id: WidgetId,
        expected: i32,
        asserted_owner: Option<DbId>,
    ) -> StoreError {
        match WidgetRepo::find_row_state(&self.pool, id).await {
            Ok(state) => classify_miss(
                id,
                expected,
                asserted_owner,
                state.map(|s| RowState {
                    user_id: s.user_id,
                    version: s.version,
                }),
            ),
            Err(err) => backend(err),
        }
    }
}

#[async_trait]
impl WidgetStore for PgWidgetStore {
    async fn get(&self, id: WidgetId) -> Result<Widget, StoreError> {
        WidgetRepo::find_live(&self.pool, id)
            .await
            .map_err(backend)?
            .map(Widget::from)
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_by_owner(&self, user_id: DbId) -> Result<Vec<Widget>, StoreError> {
        let rows = WidgetRepo::list_by_owner(&self.pool, user_id)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Widget::from).collect())
    }

    async fn create(&self, widget: NewWidget) -> Result<Widget, StoreError> {
        let row = WidgetRepo::create(&self.pool, &widget)
            .await
            .map_err(backend)?
            .ok_or(StoreError::Duplicate(widget.id))?;
        tracing::info!(
            widget_id = %row.id,
            user_id = row.user_id,
            widget_type = %row.widget_type,
            "Widget created",
        );
        Ok(row.into())
    }

    async fn update_single(
        &self,
        widget: &Widget,
        expected_version: i32,
    ) -> Result<Widget, StoreError> {
        match WidgetRepo::update_if_version(&self.pool, widget, expected_version)
            .await
            .map_err(backend)?
        {
            Some(row) => Ok(row.into()),
            None => Err(self.explain_miss(widget.id, expected_version, None).await),
        }
    }

    async fn soft_delete(&self, id: WidgetId) -> Result<(), StoreError> {
        if WidgetRepo::soft_delete(&self.pool, id)
            .await
            .map_err(backend)?
        {
            tracing::info!(widget_id = %id, "Widget soft-deleted");
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    async fn batch_update_positions(
        &self,
        updates: &[WidgetPositionUpdate],
    ) -> Result<(), StoreError> {
        match WidgetRepo::batch_update_positions(&self.pool, updates)
            .await
            .map_err(backend)?
        {
            BatchOutcome::Applied => Ok(()),
            BatchOutcome::Missed { index } => {
                let failed = &updates[index];
                Err(self
                    .explain_miss(failed.id, failed.version, Some(failed.user_id))
                    .await)
            }
        }
    }
}

/// [`UserDirectory`] over the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn user_exists(&self, user_id: DbId) -> Result<bool, CoreError> {
        UserRepo::exists(&self.pool, user_id).await.map_err(|err| {
            tracing::error!(error = %err, user_id, "User lookup failed");
            CoreError::Internal(err.to_string())
        })
    }
}
