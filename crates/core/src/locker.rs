//! Lockfile inspection compatible with the package manager's own locker
//!
//! A lock is "fresh" when the `content-hash` it records equals the hash of the
//! current manifest. The hash is computed exactly like the package manager
//! does it (MD5 over a PHP `json_encode` of the relevant manifest keys), so a
//! lock written by `composer install` is recognised as fresh here.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use md5::{Digest, Md5};
use serde_json::Value;

use crate::types::{StagerError, StagerResult};

/// Manifest keys that take part in the content hash
const RELEVANT_KEYS: &[&str] = &[
    "name",
    "version",
    "require",
    "require-dev",
    "conflict",
    "replace",
    "provide",
    "minimum-stability",
    "prefer-stable",
    "repositories",
    "extra",
];

/// Outcome of a lock inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockState {
    pub found: bool,
    pub fresh: bool,
}

/// Reads the lockfile of one project and compares it with the manifest
#[derive(Debug, Clone)]
pub struct Locker {
    json_file: PathBuf,
    lock_file: PathBuf,
}

impl Locker {
    pub fn new(json_file: PathBuf, lock_file: PathBuf) -> Self {
        Self {
            json_file,
            lock_file,
        }
    }

    /// Whether a lockfile exists and lists packages
    pub fn is_locked(&self) -> StagerResult<bool> {
        if !self.lock_file.exists() {
            return Ok(false);
        }
        let lock = self.read_lock()?;
        Ok(lock.get("packages").is_some())
    }

    /// Whether the lock was generated from the current manifest
    pub fn is_fresh(&self) -> StagerResult<bool> {
        let lock = self.read_lock()?;
        let manifest_contents = std::fs::read_to_string(&self.json_file)?;

        if let Some(content_hash) = non_empty_str(&lock, "content-hash") {
            let manifest: Value = serde_json::from_str(&manifest_contents)?;
            return Ok(content_hash == content_hash_of(&manifest)?);
        }

        if let Some(legacy_hash) = non_empty_str(&lock, "hash") {
            return Ok(legacy_hash == md5_hex(manifest_contents.as_bytes()));
        }

        Ok(false)
    }

    /// `found`/`fresh` in one pass; freshness is only checked for an existing lock
    pub fn inspect(&self) -> StagerResult<LockState> {
        if !self.is_locked()? {
            return Ok(LockState::default());
        }
        Ok(LockState {
            found: true,
            fresh: self.is_fresh()?,
        })
    }

    fn read_lock(&self) -> StagerResult<Value> {
        let contents = std::fs::read_to_string(&self.lock_file)?;
        serde_json::from_str(&contents).map_err(|e| {
            StagerError::Operation(format!(
                "\"{}\" does not contain valid JSON: {}",
                self.lock_file.display(),
                e
            ))
        })
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Content hash of a parsed manifest
pub fn content_hash_of(manifest: &Value) -> StagerResult<String> {
    let content = manifest.as_object().ok_or_else(|| {
        StagerError::Operation("composer.json must contain a JSON object".to_string())
    })?;

    let mut relevant: BTreeMap<&str, Value> = BTreeMap::new();
    for key in RELEVANT_KEYS {
        if let Some(value) = content.get(*key) {
            relevant.insert(*key, value.clone());
        }
    }

    if let Some(platform) = content.get("config").and_then(|c| c.get("platform")) {
        let mut config = serde_json::Map::new();
        config.insert("platform".to_string(), platform.clone());
        relevant.insert("config", Value::Object(config));
    }

    let mut encoded = String::new();
    encoded.push('{');
    for (i, (key, value)) in relevant.iter().enumerate() {
        if i > 0 {
            encoded.push(',');
        }
        encode_php_string(key, &mut encoded);
        encoded.push(':');
        encode_php_json(value, &mut encoded);
    }
    encoded.push('}');

    // An empty relevant set is an empty PHP array, which encodes as a list
    if relevant.is_empty() {
        encoded = "[]".to_string();
    }

    Ok(md5_hex(encoded.as_bytes()))
}

fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Encode like PHP's `json_encode` with default flags on data decoded as associative arrays
fn encode_php_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => encode_php_string(s, out),
        Value::Array(items) => encode_php_list(items.iter(), out),
        Value::Object(map) => {
            // PHP arrays with keys 0..n-1 in order are lists, including the empty one
            let is_list = map
                .keys()
                .enumerate()
                .all(|(i, key)| key == &i.to_string());
            if is_list {
                encode_php_list(map.values(), out);
                return;
            }

            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_php_string(key, out);
                out.push(':');
                encode_php_json(item, out);
            }
            out.push('}');
        }
    }
}

fn encode_php_list<'a>(items: impl Iterator<Item = &'a Value>, out: &mut String) {
    out.push('[');
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(',');
        }
        encode_php_json(item, out);
    }
    out.push(']');
}

fn encode_php_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (' '..='\u{7f}').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}
