//! Manifest schema validation
//!
//! The package manager's manifest schema (draft-04) is embedded at build time
//! and compiled with the `jsonschema` crate. Violations are reported with the
//! path of the offending value in dotted form, e.g. `[scripts.test[1]]`.

use std::fmt;

use jsonschema::Validator;
use serde_json::Value;

use crate::types::{StagerError, StagerResult};

const COMPOSER_SCHEMA: &str = include_str!("../res/composer-schema.json");

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the offending value, empty for the document root
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", self.path, self.message)
        }
    }
}

/// The manifest schema document, before compilation
#[derive(Debug, Clone)]
pub struct ManifestSchema {
    root: Value,
}

impl ManifestSchema {
    /// The embedded manifest schema
    pub fn composer() -> StagerResult<Self> {
        Ok(Self {
            root: serde_json::from_str(COMPOSER_SCHEMA)?,
        })
    }

    /// Drop the root-level `required` list
    ///
    /// Projects are not published packages, so `name` and `description` are
    /// optional for them. Draft-04 forbids an empty `required`, so the
    /// keyword is removed rather than emptied.
    pub fn without_required(mut self) -> Self {
        if let Some(root) = self.root.as_object_mut() {
            root.remove("required");
        }
        self
    }

    pub fn compile(&self) -> StagerResult<ManifestValidator> {
        let validator = jsonschema::draft4::new(&self.root)
            .map_err(|e| StagerError::Schema(format!("Invalid manifest schema: {}", e)))?;
        Ok(ManifestValidator { validator })
    }
}

/// A compiled manifest schema
pub struct ManifestValidator {
    validator: Validator,
}

impl ManifestValidator {
    /// Validate `value`, collecting every violation
    pub fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let violations: Vec<SchemaViolation> = self
            .validator
            .iter_errors(value)
            .map(|error| SchemaViolation {
                path: dotted_path(value, &error.instance_path.to_string()),
                message: error.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Render a JSON pointer into `instance` as `key.key[index]`
fn dotted_path(instance: &Value, pointer: &str) -> String {
    let mut path = String::new();
    let mut current = Some(instance);

    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        match current {
            Some(Value::Array(items)) => {
                path.push_str(&format!("[{}]", token));
                current = token.parse::<usize>().ok().and_then(|i| items.get(i));
            }
            other => {
                if !path.is_empty() {
                    path.push('.');
                }
                current = other.and_then(|value| value.get(&token));
                path.push_str(&token);
            }
        }
    }

    path
}
