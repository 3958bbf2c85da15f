//! Widget layout engine.
//!
//! Orchestrates the registry, the settings validator, the store and the cache:
//! input validation and ownership checks happen here, before any write;
//! version checks are repeated authoritatively inside the store.
//!
//! Error discipline:
//! - malformed input, unknown types, schema or size violations -> `Validation`
//! - missing/soft-deleted widgets, unknown users -> `NotFound`
//! - caller is not the owner -> `Forbidden`
//! - stale version -> `VersionConflict` carrying the current version
//!
//! Nothing is retried here; conflicts go back to the caller.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use validator::Validate;

use super::cache::{owner_list_key, widget_key, WidgetCache};
use super::model::{BatchUpdateWidgets, CreateWidget, NewWidget, UpdateWidget, Widget};
use super::registry::{TypeRegistry, WidgetTypeDescriptor};
use super::settings::SettingsValidator;
use super::store::{UserDirectory, WidgetStore};
use crate::error::CoreError;
use crate::types::{DbId, WidgetId};

/// Default deadline for a single store or user-directory call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`WidgetEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for each store call. An elapsed deadline drops the in-flight
    /// call, which rolls back any open transaction.
    pub store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Entry point for every widget layout operation.
pub struct WidgetEngine {
    settings: SettingsValidator,
    store: Arc<dyn WidgetStore>,
    users: Arc<dyn UserDirectory>,
    cache: Arc<dyn WidgetCache>,
    config: EngineConfig,
}

impl WidgetEngine {
    pub fn new(
        registry: Arc<TypeRegistry>,
        store: Arc<dyn WidgetStore>,
        users: Arc<dyn UserDirectory>,
        cache: Arc<dyn WidgetCache>,
        config: EngineConfig,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            settings: SettingsValidator::new(registry)?,
            store,
            users,
            cache,
            config,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.settings.registry()
    }

    /// All registered widget types.
    pub fn widget_types(&self) -> Vec<&WidgetTypeDescriptor> {
        self.registry().list_all()
    }

    pub fn widget_type(&self, type_key: &str) -> Result<&WidgetTypeDescriptor, CoreError> {
        self.registry().describe(type_key)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fetch a live widget, reading through the cache.
    pub async fn get_widget(&self, id: WidgetId) -> Result<Widget, CoreError> {
        if let Some(widget) = self.cache.get_widget(id) {
            tracing::debug!(widget_id = %id, "Widget served from cache");
            return Ok(widget);
        }

        // Sampled before the store read so a concurrent invalidation wins.
        let generation = self.cache.generation(&widget_key(id));
        let widget = self.bounded("get widget", self.store.get(id)).await?;
        self.cache.put_widget(&widget, generation);
        Ok(widget)
    }

    /// A user's live widgets in reading order, reading through the cache.
    pub async fn list_user_widgets(&self, user_id: DbId) -> Result<Vec<Widget>, CoreError> {
        self.ensure_user_exists(user_id).await?;

        if let Some(widgets) = self.cache.get_owner_widgets(user_id) {
            tracing::debug!(user_id, "User widgets served from cache");
            return Ok(widgets);
        }

        let generation = self.cache.generation(&owner_list_key(user_id));
        let widgets = self
            .bounded("list widgets", self.store.list_by_owner(user_id))
            .await?;
        self.cache.put_owner_widgets(user_id, &widgets, generation);
        Ok(widgets)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a widget owned by `caller`.
    pub async fn create_widget(
        &self,
        caller: DbId,
        input: CreateWidget,
    ) -> Result<Widget, CoreError> {
        input.validate()?;

        let descriptor = self.registry().describe(&input.widget_type).map_err(|_| {
            CoreError::Validation(format!("invalid widget type: {}", input.widget_type))
        })?;

        let settings = match input.settings {
            Some(settings) if !settings.is_null() => {
                self.settings
                    .validate(&descriptor.type_key, Some(&settings))?;
                settings
            }
            _ => descriptor.default_settings.clone(),
        };

        let w = input.w.unwrap_or(descriptor.default_size.w);
        let h = input.h.unwrap_or(descriptor.default_size.h);
        self.registry().check_size(&descriptor.type_key, w, h)?;

        self.ensure_user_exists(caller).await?;

        let component = input
            .component
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| descriptor.default_component.clone());

        let new_widget = NewWidget {
            id: Uuid::new_v4(),
            user_id: caller,
            widget_type: descriptor.type_key.clone(),
            component,
            x: input.x,
            y: input.y,
            w,
            h,
            settings: Some(settings),
            display_name: input.display_name.filter(|n| !n.is_empty()),
        };

        let widget = self
            .bounded_write(
                "create widget",
                &[owner_list_key(caller)],
                self.store.create(new_widget),
            )
            .await?;

        self.cache.invalidate(&owner_list_key(caller));
        Ok(widget)
    }

    /// Partially update a widget under optimistic concurrency control.
    ///
    /// `input.version` must equal the widget's current version. The store
    /// repeats that comparison atomically, so a concurrent writer that wins
    /// between the check here and the write still produces a conflict.
    pub async fn update_widget(
        &self,
        caller: DbId,
        id: WidgetId,
        input: UpdateWidget,
    ) -> Result<Widget, CoreError> {
        let expected = input
            .version
            .ok_or_else(|| CoreError::Validation("version is required for updates".into()))?;
        input.validate()?;

        let current = self.bounded("load widget", self.store.get(id)).await?;

        if current.user_id != caller {
            return Err(CoreError::Forbidden(format!(
                "user {caller} does not own widget {id}"
            )));
        }

        if current.version != expected {
            tracing::debug!(
                widget_id = %id,
                expected,
                current = current.version,
                "Rejected widget update with stale version",
            );
            return Err(CoreError::VersionConflict {
                entity: "Widget",
                id: id.to_string(),
                expected,
                current: current.version,
            });
        }

        let mut widget = current.clone();

        match input.widget_type {
            Some(new_type) if new_type != current.widget_type => {
                if !self.registry().is_valid_type(&new_type) {
                    return Err(CoreError::Validation(format!(
                        "invalid widget type: {new_type}"
                    )));
                }
                // A type change never carries the old type's settings over.
                widget.settings = Some(match input.settings {
                    Some(settings) if !settings.is_null() => {
                        self.settings.validate(&new_type, Some(&settings))?;
                        settings
                    }
                    _ => self.registry().default_settings(&new_type)?,
                });
                widget.widget_type = new_type;
            }
            _ => {
                if let Some(settings) = input.settings {
                    self.settings
                        .validate(&current.widget_type, Some(&settings))?;
                    widget.settings = Some(settings);
                }
            }
        }

        if let Some(component) = input.component {
            widget.component = component;
        }
        if let Some(x) = input.x {
            widget.x = x;
        }
        if let Some(y) = input.y {
            widget.y = y;
        }
        if let Some(w) = input.w {
            widget.w = w;
        }
        if let Some(h) = input.h {
            widget.h = h;
        }
        if let Some(display_name) = input.display_name {
            widget.display_name = Some(display_name);
        }
        if let Some(is_visible) = input.is_visible {
            widget.is_visible = is_visible;
        }

        let bounds_changed = widget.w != current.w
            || widget.h != current.h
            || widget.widget_type != current.widget_type;
        if bounds_changed {
            self.registry()
                .check_size(&widget.widget_type, widget.w, widget.h)?;
        }

        let updated = self
            .bounded_write(
                "update widget",
                &[widget_key(id), owner_list_key(caller)],
                self.store.update_single(&widget, current.version),
            )
            .await?;

        self.cache.invalidate(&widget_key(id));
        self.cache.invalidate(&owner_list_key(updated.user_id));
        Ok(updated)
    }

    /// Soft-delete a widget owned by `caller`. Deleting twice is `NotFound`.
    pub async fn delete_widget(&self, caller: DbId, id: WidgetId) -> Result<(), CoreError> {
        let current = self.bounded("load widget", self.store.get(id)).await?;

        if current.user_id != caller {
            return Err(CoreError::Forbidden(format!(
                "user {caller} does not own widget {id}"
            )));
        }

        self.bounded_write(
            "delete widget",
            &[widget_key(id), owner_list_key(caller)],
            self.store.soft_delete(id),
        )
        .await?;

        self.cache.invalidate(&widget_key(id));
        self.cache.invalidate(&owner_list_key(caller));
        Ok(())
    }

    /// Reposition several widgets atomically.
    ///
    /// Every entry must assert `caller` as owner; otherwise the whole batch
    /// is refused before storage is touched. Within the store the batch is a
    /// single all-or-nothing unit: the first stale, missing or foreign entry
    /// aborts it and is reported as `NotFound` or `VersionConflict`.
    pub async fn batch_update_positions(
        &self,
        caller: DbId,
        input: BatchUpdateWidgets,
    ) -> Result<(), CoreError> {
        input.validate()?;
        for update in &input.updates {
            update.validate()?;
        }

        if let Some(foreign) = input.updates.iter().find(|u| u.user_id != caller) {
            return Err(CoreError::Forbidden(format!(
                "widget {} is asserted to belong to user {}; user {caller} may only \
                 reposition their own widgets",
                foreign.id, foreign.user_id
            )));
        }

        let mut seen = HashSet::with_capacity(input.updates.len());
        if let Some(dup) = input.updates.iter().find(|u| !seen.insert(u.id)) {
            return Err(CoreError::Validation(format!(
                "widget {} appears more than once in the batch",
                dup.id
            )));
        }

        self.ensure_user_exists(caller).await?;

        // Size bounds depend on each widget's type. Entries whose version no
        // longer matches are left for the store to reject.
        let owned: HashMap<WidgetId, Widget> = self
            .bounded("list widgets", self.store.list_by_owner(caller))
            .await?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();
        for update in &input.updates {
            if let Some(widget) = owned.get(&update.id) {
                if widget.version == update.version {
                    self.registry()
                        .check_size(&widget.widget_type, update.w, update.h)?;
                }
            }
        }

        let touched: Vec<String> = std::iter::once(owner_list_key(caller))
            .chain(input.updates.iter().map(|u| widget_key(u.id)))
            .collect();
        if let Err(err) = self
            .bounded_write(
                "batch update positions",
                &touched,
                self.store.batch_update_positions(&input.updates),
            )
            .await
        {
            tracing::debug!(
                user_id = caller,
                update_count = input.updates.len(),
                error = %err,
                "Batch position update rejected",
            );
            return Err(err);
        }

        for key in &touched {
            self.cache.invalidate(key);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn ensure_user_exists(&self, user_id: DbId) -> Result<(), CoreError> {
        let exists = self
            .bounded("user lookup", self.users.user_exists(user_id))
            .await?;
        if exists {
            Ok(())
        } else {
            Err(CoreError::not_found("User", user_id))
        }
    }

    /// Run a collaborator call under the configured deadline.
    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, CoreError>
    where
        E: Into<CoreError>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(self.timed_out(operation)),
        }
    }

    /// Like [`Self::bounded`] for writes.
    ///
    /// A write that outlives the deadline may still have committed, so the
    /// cache keys it would have touched are dropped before reporting.
    async fn bounded_write<T, E>(
        &self,
        operation: &'static str,
        keys: &[String],
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, CoreError>
    where
        E: Into<CoreError>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                for key in keys {
                    self.cache.invalidate(key);
                }
                Err(self.timed_out(operation))
            }
        }
    }

    fn timed_out(&self, operation: &'static str) -> CoreError {
        let timeout_ms = self.config.store_timeout.as_millis();
        tracing::warn!(operation, timeout_ms, "Widget store call timed out");
        CoreError::Internal(format!("{operation} timed out after {timeout_ms}ms"))
    }
}
