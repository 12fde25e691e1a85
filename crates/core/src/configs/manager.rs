use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{StagerError, StagerResult};

/// Directory, relative to the project root, holding stager's own files
pub const STATE_DIR: &str = ".stager";

/// Manager configuration file name inside [`STATE_DIR`]
pub const CONFIG_FILE: &str = "config.yml";

/// Platform versions a new project can be created for when nothing is configured
pub const DEFAULT_SUPPORTED_VERSIONS: &[&str] = &["4.4", "4.9", "4.13"];

const DEFAULT_PUBLIC_DIR: &str = "public";
const DEFAULT_COMPOSER: &str = "composer";
const DEFAULT_TASK_RETENTION_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManagerConfig {
    /// PHP binary used to run the package manager. Without it the server is not usable.
    pub php_executable: Option<PathBuf>,
    /// Package manager invocation, either a command name or an argv list such as `["php", "composer.phar"]`.
    pub composer: Option<Command>,
    /// Public (web-served) directory, relative to the project root.
    pub public_dir: Option<String>,
    /// Platform versions accepted by the create-project task, oldest first.
    pub supported_versions: Option<Vec<String>>,
    /// How long a finished task is kept before it is pruned.
    pub task_retention_secs: Option<u64>,
}

impl ManagerConfig {
    /// Argv prefix used to invoke the package manager
    pub fn composer_command(&self) -> Vec<String> {
        match &self.composer {
            Some(Command::Single(cmd)) if !cmd.trim().is_empty() => vec![cmd.clone()],
            Some(Command::Multiple(cmds)) if !cmds.is_empty() => cmds.clone(),
            _ => vec![DEFAULT_COMPOSER.to_string()],
        }
    }

    pub fn public_dir(&self) -> &str {
        self.public_dir.as_deref().unwrap_or(DEFAULT_PUBLIC_DIR)
    }

    pub fn supported_versions(&self) -> Vec<String> {
        match &self.supported_versions {
            Some(versions) => versions.clone(),
            None => DEFAULT_SUPPORTED_VERSIONS
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(
            self.task_retention_secs
                .unwrap_or(DEFAULT_TASK_RETENTION_SECS),
        )
    }
}

pub fn parse_manager_config(yaml_str: &str) -> StagerResult<ManagerConfig> {
    if yaml_str.trim().is_empty() {
        return Ok(ManagerConfig::default());
    }
    let config: ManagerConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

/// Load `.stager/config.yml` below `project_dir`, falling back to defaults when the file is absent
pub fn load_manager_config(project_dir: &Path) -> StagerResult<ManagerConfig> {
    let config_path = project_dir.join(STATE_DIR).join(CONFIG_FILE);
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no manager config, using defaults");
        return Ok(ManagerConfig::default());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        StagerError::Configuration(format!(
            "Failed to read manager config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    parse_manager_config(&content).map_err(|e| {
        StagerError::Configuration(format!(
            "Failed to parse manager config {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// JSON schema of the manager configuration file
pub fn manager_config_schema() -> StagerResult<serde_json::Value> {
    let schema = schemars::schema_for!(ManagerConfig);
    Ok(serde_json::to_value(schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = parse_manager_config("").unwrap();
        assert_eq!(config.composer_command(), vec!["composer".to_string()]);
        assert_eq!(config.public_dir(), "public");
        assert_eq!(config.supported_versions(), vec!["4.4", "4.9", "4.13"]);
        assert_eq!(config.task_retention(), Duration::from_secs(86400));
        assert!(config.php_executable.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
phpExecutable: /usr/bin/php8.2
composer: [php, composer.phar]
publicDir: htdocs
supportedVersions: ["4.13", "5.3"]
taskRetentionSecs: 60
"#;
        let config = parse_manager_config(yaml).unwrap();
        assert_eq!(config.php_executable, Some(PathBuf::from("/usr/bin/php8.2")));
        assert_eq!(
            config.composer_command(),
            vec!["php".to_string(), "composer.phar".to_string()]
        );
        assert_eq!(config.public_dir(), "htdocs");
        assert_eq!(config.supported_versions(), vec!["4.13", "5.3"]);
        assert_eq!(config.task_retention(), Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(parse_manager_config("phpBinary: /usr/bin/php\n").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = load_manager_config(temp_dir.path()).unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn test_load_invalid_file_is_configuration_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_dir = temp_dir.path().join(STATE_DIR);
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join(CONFIG_FILE), "composer: {nested: true}\n").unwrap();

        let err = load_manager_config(temp_dir.path()).unwrap_err();
        assert!(matches!(err, StagerError::Configuration(_)));
    }

    #[test]
    fn test_schema_lists_properties() {
        let schema = manager_config_schema().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("phpExecutable"));
        assert!(properties.contains_key("supportedVersions"));
    }
}
