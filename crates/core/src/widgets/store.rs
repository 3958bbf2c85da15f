//! Persistence seam for widgets.
//!
//! The store owns the version counter and soft-delete state. Every write is
//! a compare-and-swap on `(id, version, not deleted)`; when the predicate
//! misses, the store performs one follow-up read and reports precisely why
//! through [`classify_miss`], so callers never have to disambiguate.

use async_trait::async_trait;

use super::model::{NewWidget, Widget, WidgetPositionUpdate};
use crate::error::CoreError;
use crate::types::{DbId, WidgetId};

/// Errors surfaced by a [`WidgetStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The widget does not exist, is soft-deleted, or belongs to someone else.
    #[error("widget {0} not found")]
    NotFound(WidgetId),

    /// The row exists but its version is not the one the write asserted.
    #[error("widget {id} version conflict: expected {expected}, current {current}")]
    VersionConflict {
        id: WidgetId,
        expected: i32,
        current: i32,
    },

    /// `create` was handed an id that is already taken.
    #[error("widget {0} already exists")]
    Duplicate(WidgetId),

    /// The backing storage failed. Never shown to clients verbatim.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::not_found("Widget", id),
            StoreError::VersionConflict {
                id,
                expected,
                current,
            } => CoreError::VersionConflict {
                entity: "Widget",
                id: id.to_string(),
                expected,
                current,
            },
            StoreError::Duplicate(id) => {
                CoreError::Conflict(format!("widget with id {id} already exists"))
            }
            StoreError::Backend(source) => CoreError::Internal(source.to_string()),
        }
    }
}

/// What the disambiguating read found for a row whose write predicate missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowState {
    pub user_id: DbId,
    pub version: i32,
}

/// Turn a missed compare-and-swap into the precise error.
///
/// `current` is the live (non-deleted) row, if any. `asserted_owner` is the
/// owner the write was scoped to, when it was scoped to one; a row owned by
/// somebody else is reported as not found.
pub fn classify_miss(
    id: WidgetId,
    expected: i32,
    asserted_owner: Option<DbId>,
    current: Option<RowState>,
) -> StoreError {
    match current {
        None => StoreError::NotFound(id),
        Some(row) if asserted_owner.is_some_and(|owner| owner != row.user_id) => {
            StoreError::NotFound(id)
        }
        Some(row) => StoreError::VersionConflict {
            id,
            expected,
            current: row.version,
        },
    }
}

/// Persistent collection of widgets. All reads and writes skip
/// soft-deleted rows.
#[async_trait]
pub trait WidgetStore: Send + Sync {
    /// Fetch a live widget by id.
    async fn get(&self, id: WidgetId) -> Result<Widget, StoreError>;

    /// All live widgets of `user_id` in reading order: `y`, then `x`.
    async fn list_by_owner(&self, user_id: DbId) -> Result<Vec<Widget>, StoreError>;

    /// Insert a widget with `version = 1` and `is_visible = true`.
    async fn create(&self, widget: NewWidget) -> Result<Widget, StoreError>;

    /// Overwrite all mutable fields of `widget` if the stored version still
    /// equals `expected_version`, bumping the version by one.
    async fn update_single(
        &self,
        widget: &Widget,
        expected_version: i32,
    ) -> Result<Widget, StoreError>;

    /// Mark a live widget deleted. A second delete reports `NotFound`.
    async fn soft_delete(&self, id: WidgetId) -> Result<(), StoreError>;

    /// Apply every position update or none of them.
    ///
    /// Entries are matched on id, owner, version and liveness in the order
    /// given. The first miss aborts the whole batch and is reported through
    /// [`classify_miss`].
    async fn batch_update_positions(
        &self,
        updates: &[WidgetPositionUpdate],
    ) -> Result<(), StoreError>;
}

/// Existence check against the user collaborator.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: DbId) -> Result<bool, CoreError>;
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn missing_row_is_not_found() {
        let id = Uuid::new_v4();
        assert_matches!(classify_miss(id, 3, None, None), StoreError::NotFound(got) if got == id);
    }

    #[test]
    fn live_row_with_other_version_is_conflict() {
        let id = Uuid::new_v4();
        let row = RowState { user_id: 1, version: 5 };
        assert_matches!(
            classify_miss(id, 3, Some(1), Some(row)),
            StoreError::VersionConflict { expected: 3, current: 5, .. }
        );
    }

    #[test]
    fn row_of_another_owner_is_not_found() {
        let id = Uuid::new_v4();
        let row = RowState { user_id: 2, version: 3 };
        assert_matches!(classify_miss(id, 3, Some(1), Some(row)), StoreError::NotFound(_));
    }

    #[test]
    fn conflict_converts_to_core_error_with_versions() {
        let id = Uuid::new_v4();
        let core: CoreError = StoreError::VersionConflict {
            id,
            expected: 1,
            current: 2,
        }
        .into();
        assert_matches!(
            core,
            CoreError::VersionConflict { expected: 1, current: 2, .. }
        );
    }
}
