//! Settings payload validation.
//!
//! Every registered type owns a JSON Schema; this module compiles each one
//! once and dispatches a payload to the compiled schema of its type. Adding
//! a widget type never adds a branch here.

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::{Draft, Validator};
use serde_json::Value;

use super::registry::TypeRegistry;
use crate::error::CoreError;

/// Validates settings payloads against their type's declared schema.
pub struct SettingsValidator {
    registry: Arc<TypeRegistry>,
    compiled: HashMap<String, Validator>,
}

impl SettingsValidator {
    /// Compile the schema of every registered type.
    ///
    /// Fails if a descriptor carries a malformed schema, which is a
    /// programming error in the catalog rather than a client error.
    pub fn new(registry: Arc<TypeRegistry>) -> Result<Self, CoreError> {
        let mut compiled = HashMap::new();
        for descriptor in registry.list_all() {
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&descriptor.schema)
                .map_err(|err| {
                    CoreError::Internal(format!(
                        "invalid settings schema for widget type '{}': {err}",
                        descriptor.type_key
                    ))
                })?;
            compiled.insert(descriptor.type_key.clone(), validator);
        }
        Ok(Self { registry, compiled })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Validate `settings` against the schema of `type_key`.
    ///
    /// An absent or `null` payload is always valid (the caller substitutes
    /// defaults). All violations are collected into one error so a client
    /// sees every problem at once.
    pub fn validate(&self, type_key: &str, settings: Option<&Value>) -> Result<(), CoreError> {
        let validator = self
            .compiled
            .get(type_key)
            .ok_or_else(|| CoreError::Validation(format!("invalid widget type: {type_key}")))?;

        let payload = match settings {
            None | Some(Value::Null) => return Ok(()),
            Some(payload) => payload,
        };

        let violations: Vec<String> = validator
            .iter_errors(payload)
            .map(|err| format!("- {err}"))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid settings for widget type '{type_key}':\n{}",
                violations.join("\n")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn validator() -> SettingsValidator {
        SettingsValidator::new(Arc::new(TypeRegistry::builtin())).unwrap()
    }

    #[test]
    fn absent_and_null_payloads_are_valid() {
        let v = validator();
        assert!(v.validate("experience", None).is_ok());
        assert!(v.validate("experience", Some(&Value::Null)).is_ok());
    }

    #[test]
    fn defaults_validate_against_their_own_schema() {
        let v = validator();
        for d in v.registry().list_all() {
            assert!(
                v.validate(&d.type_key, Some(&d.default_settings)).is_ok(),
                "defaults of {} must satisfy its schema",
                d.type_key
            );
        }
    }

    #[test]
    fn well_formed_experience_settings_pass() {
        let settings = json!({
            "experiences": [
                { "company": "Acme", "title": "Engineer", "startDate": "2020-01" }
            ],
            "showDates": false
        });
        assert!(validator().validate("experience", Some(&settings)).is_ok());
    }

    #[test]
    fn unknown_type_is_a_validation_error() {
        assert_matches!(
            validator().validate("guestbook", Some(&json!({}))),
            Err(CoreError::Validation(msg)) if msg.contains("guestbook")
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert_matches!(
            validator().validate("education", Some(&json!("schools"))),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn all_violations_are_reported_together() {
        // Missing required `title`, wrong-typed `showDates`, wrong-typed `company`.
        let settings = json!({
            "experiences": [
                { "company": 42, "startDate": "2020-01" }
            ],
            "showDates": "yes"
        });
        let err = validator()
            .validate("experience", Some(&settings))
            .unwrap_err();
        let CoreError::Validation(msg) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let reported = msg.lines().filter(|l| l.starts_with("- ")).count();
        assert_eq!(reported, 3, "every violation should be listed: {msg}");
    }
}
