//! The immutable request a task is created from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Name and options of a requested task.
///
/// **Purpose**: A `TaskConfig` is captured once, when the user asks for a task,
/// and persisted alongside the task. Operations read their inputs from it but
/// can never change it; there are no mutating methods.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use stager_operation_protocol::TaskConfig;
///
/// let config = TaskConfig::new("composer/create-project")
///     .with_option("version", json!("4.13"))
///     .with_option("core-only", json!(true));
///
/// assert_eq!(config.option_str("version"), Some("4.13"));
/// assert!(config.option_bool("core-only", false));
/// assert!(!config.option_bool("no-install", false));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    name: String,
    #[serde(default)]
    options: BTreeMap<String, JsonValue>,
}

impl TaskConfig {
    /// Create a task config with no options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Builder-style option setter, only usable before the config is shared.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// The task name, e.g. `composer/install`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All options keyed by name.
    pub fn options(&self) -> &BTreeMap<String, JsonValue> {
        &self.options
    }

    /// Raw option lookup.
    pub fn option(&self, key: &str) -> Option<&JsonValue> {
        self.options.get(key)
    }

    /// String option lookup. Non-string values are treated as absent.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(JsonValue::as_str)
    }

    /// Boolean option lookup with a default for absent or non-boolean values.
    pub fn option_bool(&self, key: &str, default: bool) -> bool {
        self.option(key).and_then(JsonValue::as_bool).unwrap_or(default)
    }

    /// List-of-strings option lookup. Non-string entries are skipped.
    pub fn option_strings(&self, key: &str) -> Vec<String> {
        match self.option(key) {
            Some(JsonValue::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(JsonValue::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_lookups_ignore_wrong_types() {
        let config = TaskConfig::new("composer/update")
            .with_option("packages", json!(["contao/core-bundle", 3, "contao/news-bundle"]))
            .with_option("dry-run", json!("yes"));

        assert_eq!(
            config.option_strings("packages"),
            vec!["contao/core-bundle", "contao/news-bundle"]
        );
        assert!(!config.option_bool("dry-run", false));
        assert_eq!(config.option_str("dry-run"), Some("yes"));
        assert!(config.option("missing").is_none());
    }

    #[test]
    fn test_serialization_keeps_name_and_options() {
        let config = TaskConfig::new("composer/install").with_option("dry-run", json!(true));
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: TaskConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, config);

        let bare: TaskConfig = serde_json::from_str(r#"{"name":"composer/install"}"#).unwrap();
        assert!(bare.options().is_empty());
    }
}
