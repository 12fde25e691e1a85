//! Generates the manifest of a fresh managed installation

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Map, Value};
use stager_operation_protocol::{ConsoleOutput, InlineOperation, TaskConfig};
use tempfile::NamedTempFile;

use crate::environment::Environment;
use crate::operations::bootstrap::{policy_for, PlatformVersion};
use crate::types::{StagerError, StagerResult};

/// Bundles added to the core package unless the task asks for core only
const STANDARD_BUNDLES: [&str; 6] = [
    "contao/calendar-bundle",
    "contao/comments-bundle",
    "contao/faq-bundle",
    "contao/listing-bundle",
    "contao/news-bundle",
    "contao/newsletter-bundle",
];

/// Writes `composer.json` for a new project, in place of `composer create-project`
#[derive(Debug)]
pub struct CreateProjectOperation {
    environment: Environment,
    version: String,
    platform_version: PlatformVersion,
    core_only: bool,
}

impl CreateProjectOperation {
    /// Validate the task options. Does not touch the filesystem.
    ///
    /// Reads the `version` and `core-only` options; `version` must be one of
    /// `supported_versions`.
    pub fn new(
        config: &TaskConfig,
        environment: Environment,
        supported_versions: &[String],
    ) -> StagerResult<Self> {
        let version = config.option_str("version").unwrap_or_default().to_string();

        if !supported_versions.iter().any(|v| v == &version) {
            return Err(StagerError::Configuration(
                "Unsupported Contao version".to_string(),
            ));
        }

        if environment.project_dir() == environment.public_dir() {
            return Err(StagerError::Configuration(
                "Cannot install without a public directory.".to_string(),
            ));
        }

        let platform_version = version.parse()?;

        Ok(Self {
            environment,
            version,
            platform_version,
            core_only: config.option_bool("core-only", false),
        })
    }

    /// The manifest this operation writes
    pub fn manifest(&self) -> Value {
        let constraint = format!("{}.*", self.version);

        let mut require = Map::new();
        require.insert("contao/conflicts".to_string(), json!("*@dev"));
        require.insert("contao/manager-bundle".to_string(), json!(constraint));
        if !self.core_only {
            for bundle in STANDARD_BUNDLES {
                require.insert(bundle.to_string(), json!(constraint));
            }
        }

        let policy = policy_for(self.platform_version);

        json!({
            "type": "project",
            "require": require,
            "extra": {
                "public-dir": policy.public_dir_name(self.environment.public_dir()),
                "contao-component-dir": "assets"
            },
            "scripts": {
                "post-install-cmd": [policy.script],
                "post-update-cmd": [policy.script]
            }
        })
    }
}

impl InlineOperation for CreateProjectOperation {
    fn name(&self) -> &str {
        "create-project"
    }

    fn summary(&self) -> String {
        format!("composer create-project contao/managed-edition:{}", self.version)
    }

    fn do_run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()> {
        let target = self.environment.json_file();
        let manifest = self.manifest();

        if self.already_written(&manifest) {
            tracing::info!(version = %self.version, "project manifest already in place");
            console.append(format!("Kept {}\n", target.display()));
            return Ok(());
        }

        let protected = [
            self.environment.json_file(),
            self.environment.lock_file(),
            self.environment.vendor_dir(),
        ];
        if protected.iter().any(|path| path.exists()) {
            return Err(StagerError::Precondition(
                "Cannot install into existing application".to_string(),
            )
            .into());
        }

        write_pretty(&target, &manifest)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        tracing::info!(version = %self.version, core_only = self.core_only, "wrote project manifest");
        console.append(format!("Created {}\n", target.display()));
        Ok(())
    }
}

impl CreateProjectOperation {
    /// Whether an earlier run wrote `manifest` and stopped before recording it
    ///
    /// Only the bare manifest counts: once a lockfile or vendor directory
    /// exists the project is an installation, not an interrupted write.
    fn already_written(&self, manifest: &Value) -> bool {
        !self.environment.lock_file().exists()
            && !self.environment.vendor_dir().exists()
            && self
                .environment
                .manifest()
                .is_ok_and(|existing| existing == *manifest)
    }
}

/// Atomically write `value` with four-space indentation
fn write_pretty(target: &Path, value: &Value) -> anyhow::Result<()> {
    let dir = target
        .parent()
        .context("Manifest path has no parent directory")?;
    let mut file = NamedTempFile::new_in(dir)?;

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut file, formatter);
    value.serialize(&mut serializer)?;
    file.write_all(b"\n")?;

    file.persist(target)?;
    Ok(())
}
