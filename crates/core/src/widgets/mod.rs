//! Widget layout engine.
//!
//! A user's profile layout is a set of positioned, typed panels. This module
//! holds everything needed to mutate that set safely:
//!
//! - [`registry`] -- static catalog of widget types (size bounds, schema, defaults).
//! - [`settings`] -- schema validation of free-form settings payloads.
//! - [`store`] -- the persistence seam, with version-checked writes.
//! - [`memory`] -- in-process store and user directory.
//! - [`cache`] -- read-through cache seam and its in-process implementation.
//! - [`engine`] -- orchestration: ownership, validation, optimistic concurrency.

pub mod cache;
pub mod engine;
pub mod memory;
pub mod model;
pub mod registry;
pub mod settings;
pub mod store;

pub use cache::{MemoryWidgetCache, WidgetCache};
pub use engine::{EngineConfig, WidgetEngine};
pub use memory::{MemoryUserDirectory, MemoryWidgetStore};
pub use model::{
    BatchUpdateWidgets, CreateWidget, NewWidget, UpdateWidget, Widget, WidgetPositionUpdate,
};
pub use registry::{GridSize, TypeRegistry, WidgetTypeDescriptor};
pub use settings::SettingsValidator;
pub use store::{StoreError, UserDirectory, WidgetStore};
