//! Integration tests for the PostgreSQL widget store.
//!
//! Exercises `PgWidgetStore` against a real database to verify that:
//! - Conditional updates bump the version and reject stale versions
//! - Soft-deleted widgets are hidden but retained, and a second delete misses
//! - Batch position updates are all-or-nothing and report the failing entry
//! - Listing follows reading order
//!
//! Requires `DATABASE_URL`; run with `cargo test -- --ignored`.

use assert_matches::assert_matches;
use perfolio_core::types::DbId;
use perfolio_core::widgets::{
    NewWidget, StoreError, UserDirectory, Widget, WidgetPositionUpdate, WidgetStore,
};
use perfolio_db::models::user::CreateUser;
use perfolio_db::repositories::{UserRepo, WidgetRepo};
use perfolio_db::{PgUserDirectory, PgWidgetStore};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, name: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
        },
    )
    .await
    .unwrap()
    .id
}

fn new_widget(user_id: DbId, x: i32, y: i32) -> NewWidget {
    NewWidget {
        id: Uuid::new_v4(),
        user_id,
        widget_type: "experience".to_string(),
        component: "ExperienceWidget".to_string(),
        x,
        y,
        w: 6,
        h: 4,
        settings: Some(json!({ "experiences": [], "showDates": true })),
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

// ---------------------------------------------------------------------------
// Create / read
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_starts_at_version_one(pool: PgPool) {
    let user = seed_user(&pool, "alice").await;
    let store = PgWidgetStore::new(pool);

    let input = new_widget(user, 0, 0);
    let created = store.create(input.clone()).await.unwrap();
    assert_eq!(created.version, 1);
    assert!(created.is_visible);
    assert_eq!(created.settings, input.settings);

    assert_matches!(store.create(input).await, Err(StoreError::Duplicate(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_list_by_owner_uses_reading_order(pool: PgPool) {
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let store = PgWidgetStore::new(pool);

    let c = store.create(new_widget(alice, 6, 4)).await.unwrap();
    let a = store.create(new_widget(alice, 6, 0)).await.unwrap();
    let b = store.create(new_widget(alice, 0, 4)).await.unwrap();
    store.create(new_widget(bob, 0, 0)).await.unwrap();

    let ids: Vec<_> = store
        .list_by_owner(alice)
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
}

// ---------------------------------------------------------------------------
// Conditional update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_update_single_rejects_stale_version(pool: PgPool) {
    let user = seed_user(&pool, "alice").await;
    let store = PgWidgetStore::new(pool);
    let created = store.create(new_widget(user, 0, 0)).await.unwrap();

    let mut moved = created.clone();
    moved.y = 6;
    let updated = store.update_single(&moved, 1).await.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.y, 6);

    let mut stale = created.clone();
    stale.x = 3;
    assert_matches!(
        store.update_single(&stale, 1).await,
        Err(StoreError::VersionConflict { expected: 1, current: 2, .. })
    );

    let row = store.get(created.id).await.unwrap();
    assert_eq!((row.x, row.y, row.version), (0, 6, 2));
}

// ---------------------------------------------------------------------------
// Soft delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_soft_delete_hides_but_retains_row(pool: PgPool) {
    let user = seed_user(&pool, "alice").await;
    let store = PgWidgetStore::new(pool.clone());
    let created = store.create(new_widget(user, 0, 0)).await.unwrap();

    store.soft_delete(created.id).await.unwrap();

    assert_matches!(store.get(created.id).await, Err(StoreError::NotFound(_)));
    assert!(store.list_by_owner(user).await.unwrap().is_empty());
    assert_matches!(store.soft_delete(created.id).await, Err(StoreError::NotFound(_)));
    assert_matches!(
        store.update_single(&created, 1).await,
        Err(StoreError::NotFound(_))
    );

    let retained = WidgetRepo::find_by_id_including_deleted(&pool, created.id)
        .await
        .unwrap()
        .expect("soft-deleted row should still exist");
    assert!(retained.deleted_at.is_some());
    assert_eq!(retained.version, 1);
}

// ---------------------------------------------------------------------------
// Batch position update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_batch_with_stale_entry_rolls_back(pool: PgPool) {
    let user = seed_user(&pool, "alice").await;
    let store = PgWidgetStore::new(pool);
    let a = store.create(new_widget(user, 0, 0)).await.unwrap();
    let b = store.create(new_widget(user, 6, 0)).await.unwrap();
    let c = store.create(new_widget(user, 0, 4)).await.unwrap();

    let updates = vec![move_to(&a, 8, 1), move_to(&b, 8, 5), move_to(&c, 8, 1)];
    assert_matches!(
        store.batch_update_positions(&updates).await,
        Err(StoreError::VersionConflict { id, expected: 5, current: 1 }) if id == b.id
    );

    for original in [&a, &b, &c] {
        let row = store.get(original.id).await.unwrap();
        assert_eq!(row.y, original.y, "no entry may be applied");
        assert_eq!(row.version, 1);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_batch_applies_all_and_bumps_versions(pool: PgPool) {
    let user = seed_user(&pool, "alice").await;
    let store = PgWidgetStore::new(pool);
    let a = store.create(new_widget(user, 0, 0)).await.unwrap();
    let b = store.create(new_widget(user, 6, 0)).await.unwrap();

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

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_batch_entry_for_foreign_widget_is_not_found(pool: PgPool) {
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let store = PgWidgetStore::new(pool);
    let theirs = store.create(new_widget(bob, 0, 0)).await.unwrap();

    let mut update = move_to(&theirs, 4, 1);
    update.user_id = alice;
    assert_matches!(
        store.batch_update_positions(&[update]).await,
        Err(StoreError::NotFound(_))
    );
    assert_eq!(store.get(theirs.id).await.unwrap().version, 1);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_user_directory_checks_existence(pool: PgPool) {
    let alice = seed_user(&pool, "alice").await;
    let users = PgUserDirectory::new(pool);

    assert!(users.user_exists(alice).await.unwrap());
    assert!(!users.user_exists(alice + 1000).await.unwrap());
}
