//! In-process implementations of the widget seams.
//!
//! Used by tests and local development. The store keeps soft-deleted rows
//! in place, like the database does, and applies batches in two phases
//! (stage every entry, then publish) under a single write lock so readers
//! never observe a half-applied batch.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::{NewWidget, Widget, WidgetPositionUpdate};
use super::store::{classify_miss, RowState, StoreError, UserDirectory, WidgetStore};
use crate::error::CoreError;
use crate::types::{DbId, WidgetId};

/// Widget store backed by a `HashMap` behind a `tokio` `RwLock`.
#[derive(Default)]
pub struct MemoryWidgetStore {
    rows: RwLock<HashMap<WidgetId, Widget>>,
}

impl MemoryWidgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a row regardless of soft-delete state.
    pub async fn get_including_deleted(&self, id: WidgetId) -> Option<Widget> {
        self.rows.read().await.get(&id).cloned()
    }
}

fn live_state(row: Option<&Widget>) -> Option<RowState> {
    row.filter(|w| w.deleted_at.is_none()).map(|w| RowState {
        user_id: w.user_id,
        version: w.version,
    })
}

#[async_trait]
impl WidgetStore for MemoryWidgetStore {
    async fn get(&self, id: WidgetId) -> Result<Widget, StoreError> {
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|w| w.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_by_owner(&self, user_id: DbId) -> Result<Vec<Widget>, StoreError> {
        let mut widgets: Vec<Widget> = self
            .rows
            .read()
            .await
            .values()
            .filter(|w| w.user_id == user_id && w.deleted_at.is_none())
            .cloned()
            .collect();
        widgets.sort_by(|a, b| {
            (a.y, a.x, a.created_at, a.id).cmp(&(b.y, b.x, b.created_at, b.id))
        });
        Ok(widgets)
    }

    async fn create(&self, widget: NewWidget) -> Result<Widget, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&widget.id) {
            return Err(StoreError::Duplicate(widget.id));
        }
        let now = chrono::Utc::now();
        let created = Widget {
            id: widget.id,
            user_id: widget.user_id,
            widget_type: widget.widget_type,
            component: widget.component,
            x: widget.x,
            y: widget.y,
            w: widget.w,
            h: widget.h,
            settings: widget.settings,
            display_name: widget.display_name,
            is_visible: true,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_single(
        &self,
        widget: &Widget,
        expected_version: i32,
    ) -> Result<Widget, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&widget.id) {
            Some(row) if row.deleted_at.is_none() && row.version == expected_version => {
                row.widget_type = widget.widget_type.clone();
                row.component = widget.component.clone();
                row.x = widget.x;
                row.y = widget.y;
                row.w = widget.w;
                row.h = widget.h;
                row.settings = widget.settings.clone();
                row.display_name = widget.display_name.clone();
                row.is_visible = widget.is_visible;
                row.version += 1;
                row.updated_at = chrono::Utc::now();
                Ok(row.clone())
            }
            other => Err(classify_miss(
                widget.id,
                expected_version,
                None,
                live_state(other.map(|r| &*r)),
            )),
        }
    }

    async fn soft_delete(&self, id: WidgetId) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(chrono::Utc::now());
                Ok(())
            }
            _ => Err(StoreError::NotFound(id)),
        }
    }

    async fn batch_update_positions(
        &self,
        updates: &[WidgetPositionUpdate],
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let now = chrono::Utc::now();

        // Phase 1: apply to staged copies; committed rows stay untouched.
        let mut staged: HashMap<WidgetId, Widget> = HashMap::new();
        for update in updates {
            let candidate = staged
                .get(&update.id)
                .or_else(|| rows.get(&update.id))
                .filter(|w| {
                    w.deleted_at.is_none()
                        && w.user_id == update.user_id
                        && w.version == update.version
                })
                .cloned();

            let Some(mut row) = candidate else {
                return Err(classify_miss(
                    update.id,
                    update.version,
                    Some(update.user_id),
                    live_state(rows.get(&update.id)),
                ));
            };

            row.x = update.x;
            row.y = update.y;
            row.w = update.w;
            row.h = update.h;
            row.version += 1;
            row.updated_at = now;
            staged.insert(row.id, row);
        }

        // Phase 2: publish.
        rows.extend(staged);
        Ok(())
    }
}

/// User directory over a fixed set of ids.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashSet<DbId>>,
}

impl MemoryUserDirectory {
    pub fn new(users: impl IntoIterator<Item = DbId>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    pub async fn insert(&self, user_id: DbId) {
        self.users.write().await.insert(user_id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn user_exists(&self, user_id: DbId) -> Result<bool, CoreError> {
        Ok(self.users.read().await.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    fn new_widget(user_id: DbId, x: i32, y: i32) -> NewWidget {
        NewWidget {
            id: Uuid::new_v4(),
            user_id,
            widget_type: "experience".into(),
            component: "ExperienceWidget".into(),
            x,
            y,
            w: 6,
            h: 4,
            settings: None,
            display_name: None,
        }
    }

    fn move_to(widget: &Widget, y: i32, version: i32) -> WidgetPositionUpdate {
        WidgetPositionUpdate {
            id: widget.id,
            user_id: widget.user_id,
            x: widget.x,
            y,
            w: widget.w,
            h: widget.h,
            version,
        }
    }

    #[tokio::test]
    async fn create_assigns_version_one_and_rejects_duplicates() {
        let store = MemoryWidgetStore::new();
        let input = new_widget(1, 0, 0);
        let created = store.create(input.clone()).await.unwrap();
        assert_eq!(created.version, 1);
        assert!(created.is_visible);

        assert_matches!(store.create(input).await, Err(StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn list_by_owner_uses_reading_order() {
        let store = MemoryWidgetStore::new();
        let c = store.create(new_widget(1, 6, 4)).await.unwrap();
        let a = store.create(new_widget(1, 6, 0)).await.unwrap();
        let b = store.create(new_widget(1, 0, 4)).await.unwrap();
        store.create(new_widget(2, 0, 0)).await.unwrap();

        let ids: Vec<_> = store
            .list_by_owner(1)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[tokio::test]
    async fn update_single_with_stale_version_leaves_row_untouched() {
        let store = MemoryWidgetStore::new();
        let created = store.create(new_widget(1, 0, 0)).await.unwrap();

        let mut moved = created.clone();
        moved.y = 6;
        let updated = store.update_single(&moved, 1).await.unwrap();
        assert_eq!(updated.version, 2);

        let mut stale = created.clone();
        stale.y = 9;
        assert_matches!(
            store.update_single(&stale, 1).await,
            Err(StoreError::VersionConflict { expected: 1, current: 2, .. })
        );
        assert_eq!(store.get(created.id).await.unwrap().y, 6);
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_hidden_but_retained() {
        let store = MemoryWidgetStore::new();
        let created = store.create(new_widget(1, 0, 0)).await.unwrap();
        store.soft_delete(created.id).await.unwrap();

        assert_matches!(store.get(created.id).await, Err(StoreError::NotFound(_)));
        assert!(store.list_by_owner(1).await.unwrap().is_empty());
        assert_matches!(store.soft_delete(created.id).await, Err(StoreError::NotFound(_)));
        assert_matches!(
            store.update_single(&created, 1).await,
            Err(StoreError::NotFound(_))
        );

        let retained = store.get_including_deleted(created.id).await.unwrap();
        assert!(retained.deleted_at.is_some());
        assert_eq!(retained.version, 1, "deletion must not bump the version");
    }

    #[tokio::test]
    async fn batch_with_stale_entry_applies_nothing() {
        let store = MemoryWidgetStore::new();
        let a = store.create(new_widget(1, 0, 0)).await.unwrap();
        let b = store.create(new_widget(1, 6, 0)).await.unwrap();
        let c = store.create(new_widget(1, 0, 4)).await.unwrap();

        let updates = vec![move_to(&a, 8, 1), move_to(&b, 8, 7), move_to(&c, 8, 1)];
        assert_matches!(
            store.batch_update_positions(&updates).await,
            Err(StoreError::VersionConflict { expected: 7, current: 1, id }) if id == b.id
        );

        for original in [&a, &b, &c] {
            let now = store.get(original.id).await.unwrap();
            assert_eq!(&now, original, "row must be unchanged after an aborted batch");
        }
    }

    #[tokio::test]
    async fn batch_bumps_each_version_once() {
        let store = MemoryWidgetStore::new();
        let a = store.create(new_widget(1, 0, 0)).await.unwrap();
        let b = store.create(new_widget(1, 6, 0)).await.unwrap();

        store
            .batch_update_positions(&[move_to(&a, 4, 1), move_to(&b, 4, 1)])
            .await
            .unwrap();

        for id in [a.id, b.id] {
            let row = store.get(id).await.unwrap();
            assert_eq!(row.version, 2);
            assert_eq!(row.y, 4);
        }
    }

    #[tokio::test]
    async fn batch_entry_for_foreign_widget_is_not_found() {
        let store = MemoryWidgetStore::new();
        let theirs = store.create(new_widget(2, 0, 0)).await.unwrap();

        let mut update = move_to(&theirs, 4, 1);
        update.user_id = 1;
        assert_matches!(
            store.batch_update_positions(&[update]).await,
            Err(StoreError::NotFound(_))
        );
        assert_eq!(store.get(theirs.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn user_directory_reports_membership() {
        let users = MemoryUserDirectory::new([1, 2]);
        assert!(users.user_exists(1).await.unwrap());
        assert!(!users.user_exists(3).await.unwrap());
        users.insert(3).await;
        assert!(users.user_exists(3).await.unwrap());
    }
}
