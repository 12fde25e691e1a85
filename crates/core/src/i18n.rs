//! Message catalog for user-facing status messages

use std::collections::HashMap;

/// Message key used for every "the manifest is invalid" report
pub const COMPOSER_INVALID: &str = "boot.composer.invalid";

/// Turns a message key plus parameters into user-facing text
pub trait Translator: Send + Sync {
    /// `params` are substituted for `%name%` placeholders
    fn trans(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// Built-in catalog, one language per instance
#[derive(Debug, Clone)]
pub struct Catalog {
    messages: HashMap<&'static str, &'static str>,
}

impl Catalog {
    pub fn english() -> Self {
        let mut messages = HashMap::new();
        messages.insert(
            COMPOSER_INVALID,
            "The composer.json is invalid: %exception%",
        );
        Self { messages }
    }

    pub fn german() -> Self {
        let mut messages = HashMap::new();
        messages.insert(
            COMPOSER_INVALID,
            "Die composer.json ist ungültig: %exception%",
        );
        Self { messages }
    }

    /// Pick a catalog from a locale such as `de_CH.UTF-8`, English otherwise
    pub fn for_locale(locale: &str) -> Self {
        if locale.to_ascii_lowercase().starts_with("de") {
            Self::german()
        } else {
            Self::english()
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::english()
    }
}

impl Translator for Catalog {
    fn trans(&self, key: &str, params: &[(&str, &str)]) -> String {
        // Unknown keys fall back to the key itself so nothing is silently dropped
        let mut message = self.messages.get(key).copied().unwrap_or(key).to_string();
        for (name, value) in params {
            message = message.replace(&format!("%{}%", name), value);
        }
        message
    }
}
