//! Environment inspection
//!
//! Reports whether the project has a manifest, whether it parses and
//! validates, whether it belongs to a managed installation, and whether the
//! lockfile and vendor directory are in place. Validation is a chain of steps
//! that each return a `Result`; the first failure ends the chain and is
//! reported in the manifest's `error` slot. Only a missing hosting
//! configuration escapes as an error.

use serde_json::Value;
use thiserror::Error;

use crate::environment::{Environment, ServerInfo};
use crate::i18n::{Translator, COMPOSER_INVALID};
use crate::results::{ComposerState, LockStatus};
use crate::schema::ManifestSchema;
use crate::types::{StagerError, StagerResult};

/// Package whose presence marks a manifest as belonging to a managed installation
pub const CORE_PACKAGE: &str = "contao/manager-bundle";

/// Why a manifest did not pass inspection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Schema(String),

    #[error("{0}")]
    Lock(String),
}

/// Manifest that parsed as JSON
struct ParsedManifest(Value);

/// Manifest that also satisfies the schema
struct ValidManifest(Value);

impl ValidManifest {
    /// Whether `require` names `package`
    fn requires(&self, package: &str) -> bool {
        self.0
            .get("require")
            .and_then(Value::as_object)
            .is_some_and(|require| require.contains_key(package))
    }
}

/// Result of the checks after schema validation
enum Ownership {
    /// Declares the core package; the lock was inspected
    Managed(LockStatus),
    /// Schema-valid but not ours; presented as "no manifest"
    Foreign,
}

/// Runs the status check for one project
pub struct StatusCheck<'a> {
    environment: &'a Environment,
    server_info: &'a ServerInfo,
    translator: &'a dyn Translator,
}

impl<'a> StatusCheck<'a> {
    pub fn new(
        environment: &'a Environment,
        server_info: &'a ServerInfo,
        translator: &'a dyn Translator,
    ) -> Self {
        Self {
            environment,
            server_info,
            translator,
        }
    }

    /// Inspect the project
    ///
    /// Fails only with [`StagerError::ServiceUnavailable`], before touching the filesystem.
    pub fn run(&self) -> StagerResult<ComposerState> {
        if self.server_info.php_executable().is_none() {
            return Err(StagerError::ServiceUnavailable(
                "Missing hosting configuration.".to_string(),
            ));
        }

        let mut state = ComposerState::default();

        if !self.environment.json_file().exists() {
            tracing::debug!("no manifest found");
            return Ok(state);
        }

        state.json.found = true;
        state.json.valid = true;
        state.vendor.found = self.environment.vendor_dir().is_dir();

        match self.validate() {
            Ok(Ownership::Managed(lock)) => state.lock = lock,
            Ok(Ownership::Foreign) => {
                tracing::debug!(package = CORE_PACKAGE, "manifest does not declare core package");
                state.json.found = false;
                state.json.valid = false;
            }
            Err(error) => {
                tracing::debug!(%error, "manifest validation failed");
                let exception = error.to_string();
                state.json.valid = false;
                state.json.error = Some(
                    self.translator
                        .trans(COMPOSER_INVALID, &[("exception", exception.as_str())]),
                );
            }
        }

        Ok(state)
    }

    fn validate(&self) -> Result<Ownership, ManifestError> {
        let parsed = self.parse_manifest()?;
        let valid = self.validate_schema(parsed)?;

        if !valid.requires(CORE_PACKAGE) {
            return Ok(Ownership::Foreign);
        }

        self.inspect_lock().map(Ownership::Managed)
    }

    fn parse_manifest(&self) -> Result<ParsedManifest, ManifestError> {
        let contents = self
            .environment
            .manifest_contents()
            .map_err(|e| ManifestError::Parse(e.to_string()))?;
        serde_json::from_str(&contents)
            .map(ParsedManifest)
            .map_err(|e| {
                ManifestError::Parse(format!(
                    "\"{}\" does not contain valid JSON: {}",
                    self.environment.json_file().display(),
                    e
                ))
            })
    }

    fn validate_schema(&self, manifest: ParsedManifest) -> Result<ValidManifest, ManifestError> {
        let schema = ManifestSchema::composer()
            .and_then(|schema| schema.without_required().compile())
            .map_err(|e| ManifestError::Schema(e.to_string()))?;

        schema.validate(&manifest.0).map_err(|violations| {
            ManifestError::Schema(
                violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        })?;

        Ok(ValidManifest(manifest.0))
    }

    fn inspect_lock(&self) -> Result<LockStatus, ManifestError> {
        let lock = self
            .environment
            .locker()
            .inspect()
            .map_err(|e| ManifestError::Lock(e.to_string()))?;
        Ok(LockStatus {
            found: lock.found,
            fresh: lock.fresh,
        })
    }
}
