//! Static catalog of widget types.
//!
//! Each entry declares sizing bounds, a JSON Schema for the widget's settings
//! payload, default settings and the cosmetic customizations it accepts.
//! The catalog is built once at startup and never mutated, so it can be
//! shared behind an `Arc` and read concurrently without locking.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CoreError;

/// A width x height pair in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSize {
    pub w: i32,
    pub h: i32,
}

impl GridSize {
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

/// Immutable description of one widget type.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetTypeDescriptor {
    #[serde(rename = "type")]
    pub type_key: String,
    pub display_name: String,
    pub description: String,
    pub default_component: String,
    pub default_size: GridSize,
    pub min_size: GridSize,
    pub max_size: GridSize,
    /// JSON Schema document the settings payload must satisfy.
    pub schema: Value,
    pub default_settings: Value,
    pub customizations: Vec<String>,
}

/// Cosmetic keys every built-in type accepts.
const COMMON_CUSTOMIZATIONS: &[&str] = &["backgroundColor", "borderRadius", "showTitle"];

/// Read-only registry of widget types keyed by type key.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, WidgetTypeDescriptor>,
}

impl TypeRegistry {
    /// Build a registry from an explicit list of descriptors.
    ///
    /// Later entries with the same key replace earlier ones.
    pub fn new(descriptors: impl IntoIterator<Item = WidgetTypeDescriptor>) -> Self {
        let types = descriptors
            .into_iter()
            .map(|d| (d.type_key.clone(), d))
            .collect();
        Self { types }
    }

    /// The catalog shipped with the service.
    pub fn builtin() -> Self {
        Self::new([experience(), education(), skills(), about()])
    }

    /// Look up a type by key.
    pub fn describe(&self, type_key: &str) -> Result<&WidgetTypeDescriptor, CoreError> {
        self.types
            .get(type_key)
            .ok_or_else(|| CoreError::not_found("WidgetType", type_key))
    }

    pub fn is_valid_type(&self, type_key: &str) -> bool {
        self.types.contains_key(type_key)
    }

    /// A fresh copy of the type's default settings payload.
    pub fn default_settings(&self, type_key: &str) -> Result<Value, CoreError> {
        Ok(self.describe(type_key)?.default_settings.clone())
    }

    /// All registered types, ordered by key.
    pub fn list_all(&self) -> Vec<&WidgetTypeDescriptor> {
        self.types.values().collect()
    }

    /// Whether `customization` is one of the cosmetic keys the type accepts.
    /// Unknown types accept nothing.
    pub fn is_allowed_customization(&self, type_key: &str, customization: &str) -> bool {
        self.types
            .get(type_key)
            .is_some_and(|d| d.customizations.iter().any(|c| c == customization))
    }

    /// Check that `w x h` lies within the type's `[min_size, max_size]`.
    pub fn check_size(&self, type_key: &str, w: i32, h: i32) -> Result<(), CoreError> {
        let descriptor = self.describe(type_key)?;
        let (min, max) = (descriptor.min_size, descriptor.max_size);
        if w < min.w || w > max.w || h < min.h || h > max.h {
            return Err(CoreError::Validation(format!(
                "size {w}x{h} is outside the bounds for widget type '{type_key}' \
                 (min {}x{}, max {}x{})",
                min.w, min.h, max.w, max.h
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in types
// ---------------------------------------------------------------------------

fn common_customizations() -> Vec<String> {
    COMMON_CUSTOMIZATIONS.iter().map(|c| c.to_string()).collect()
}

fn experience() -> WidgetTypeDescriptor {
    WidgetTypeDescriptor {
        type_key: "experience".into(),
        display_name: "Work Experience".into(),
        description: "Showcase your professional experience".into(),
        default_component: "ExperienceWidget".into(),
        default_size: GridSize::new(6, 4),
        min_size: GridSize::new(3, 2),
        max_size: GridSize::new(12, 8),
        schema: json!({
            "type": "object",
            "properties": {
                "experiences": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "company": { "type": "string" },
                            "title": { "type": "string" },
                            "startDate": { "type": "string" },
                            "endDate": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["company", "title", "startDate"]
                    }
                },
                "showDates": { "type": "boolean", "default": true }
            }
        }),
        default_settings: json!({ "experiences": [], "showDates": true }),
        customizations: common_customizations(),
    }
}

fn education() -> WidgetTypeDescriptor {
    WidgetTypeDescriptor {
        type_key: "education".into(),
        display_name: "Education".into(),
        description: "Showcase your educational background".into(),
        default_component: "EducationWidget".into(),
        default_size: GridSize::new(6, 3),
        min_size: GridSize::new(3, 2),
        max_size: GridSize::new(12, 6),
        schema: json!({
            "type": "object",
            "properties": {
                "schools": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "institution": { "type": "string" },
                            "degree": { "type": "string" },
                            "field": { "type": "string" },
                            "startDate": { "type": "string" },
                            "endDate": { "type": "string" }
                        },
                        "required": ["institution", "startDate"]
                    }
                }
            }
        }),
        default_settings: json!({ "schools": [] }),
        customizations: common_customizations(),
    }
}

fn skills() -> WidgetTypeDescriptor {
    WidgetTypeDescriptor {
        type_key: "skills".into(),
        display_name: "Skills".into(),
        description: "List the skills you want to highlight".into(),
        default_component: "SkillsWidget".into(),
        default_size: GridSize::new(4, 3),
        min_size: GridSize::new(2, 2),
        max_size: GridSize::new(12, 6),
        schema: json!({
            "type": "object",
            "properties": {
                "skills": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "level": { "type": "integer", "minimum": 1, "maximum": 5 }
                        },
                        "required": ["name"]
                    }
                },
                "showLevels": { "type": "boolean" }
            }
        }),
        default_settings: json!({ "skills": [], "showLevels": false }),
        customizations: common_customizations(),
    }
}

fn about() -> WidgetTypeDescriptor {
    let mut customizations = common_customizations();
    customizations.push("textAlign".into());
    WidgetTypeDescriptor {
        type_key: "about".into(),
        display_name: "About Me".into(),
        description: "A short free-form introduction".into(),
        default_component: "AboutWidget".into(),
        default_size: GridSize::new(12, 2),
        min_size: GridSize::new(4, 1),
        max_size: GridSize::new(12, 4),
        schema: json!({
            "type": "object",
            "properties": {
                "headline": { "type": "string" },
                "body": { "type": "string" }
            }
        }),
        default_settings: json!({ "headline": "", "body": "" }),
        customizations,
    }
}
