//! Tasks and the catalog of task names
//!
//! A task is a named, persisted sequence of operations. The operations
//! themselves are not persisted: they are rebuilt from the task's
//! configuration by [`build_operations`] whenever the task is run, and matched
//! against the stored progress by position and name.

pub mod store;
pub mod task;

use stager_operation_protocol::{InProcess, Operation, TaskConfig};

use crate::configs::manager::ManagerConfig;
use crate::environment::Environment;
use crate::operations::{composer, CreateProjectOperation};
use crate::types::{StagerError, StagerResult};

pub const CREATE_PROJECT: &str = "composer/create-project";
pub const INSTALL: &str = "composer/install";
pub const UPDATE: &str = "composer/update";
pub const DUMP_AUTOLOAD: &str = "composer/dump-autoload";

/// Names accepted by [`build_operations`]
pub const TASK_NAMES: &[&str] = &[CREATE_PROJECT, INSTALL, UPDATE, DUMP_AUTOLOAD];

/// Build the operations of the task described by `config`
///
/// Fails with [`StagerError::Configuration`] for unknown task names or
/// options the operations reject. Nothing touches the filesystem.
pub fn build_operations(
    config: &TaskConfig,
    environment: &Environment,
    manager_config: &ManagerConfig,
) -> StagerResult<Vec<Box<dyn Operation>>> {
    let dry_run = config.option_bool("dry-run", false);

    let operations: Vec<Box<dyn Operation>> = match config.name() {
        CREATE_PROJECT => {
            let create = CreateProjectOperation::new(
                config,
                environment.clone(),
                &manager_config.supported_versions(),
            )?;
            let mut operations: Vec<Box<dyn Operation>> = vec![Box::new(InProcess::new(create))];
            if !config.option_bool("no-install", false) {
                operations.push(Box::new(composer::install(manager_config, environment, dry_run)?));
            }
            operations
        }
        INSTALL => vec![Box::new(composer::install(manager_config, environment, dry_run)?)],
        UPDATE => vec![Box::new(composer::update(
            manager_config,
            environment,
            &config.option_strings("packages"),
            dry_run,
        )?)],
        DUMP_AUTOLOAD => vec![Box::new(composer::dump_autoload(manager_config, environment)?)],
        other => {
            return Err(StagerError::Configuration(format!(
                "Unknown task '{}'. Available tasks: {}",
                other,
                TASK_NAMES.join(", ")
            )))
        }
    };

    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> Environment {
        Environment::new("/srv/app", "/srv/app/public")
    }

    fn names(operations: &[Box<dyn Operation>]) -> Vec<&str> {
        operations.iter().map(|op| op.name()).collect()
    }

    #[test]
    fn test_create_project_installs_by_default() {
        let config = TaskConfig::new(CREATE_PROJECT).with_option("version", json!("4.13"));
        let operations = build_operations(&config, &env(), &ManagerConfig::default()).unwrap();
        assert_eq!(names(&operations), vec!["create-project", "composer-install"]);
        assert_eq!(
            operations[0].summary(),
            "composer create-project contao/managed-edition:4.13"
        );
    }

    #[test]
    fn test_create_project_without_install() {
        let config = TaskConfig::new(CREATE_PROJECT)
            .with_option("version", json!("4.9"))
            .with_option("no-install", json!(true));
        let operations = build_operations(&config, &env(), &ManagerConfig::default()).unwrap();
        assert_eq!(names(&operations), vec!["create-project"]);
    }

    #[test]
    fn test_create_project_rejects_unsupported_version() {
        let config = TaskConfig::new(CREATE_PROJECT).with_option("version", json!("5.0"));
        let err = build_operations(&config, &env(), &ManagerConfig::default()).err().unwrap();
        assert!(matches!(err, StagerError::Configuration(_)));
    }

    #[test]
    fn test_update_passes_packages() {
        let config = TaskConfig::new(UPDATE)
            .with_option("packages", json!(["contao/news-bundle"]))
            .with_option("dry-run", json!(true));
        let operations = build_operations(&config, &env(), &ManagerConfig::default()).unwrap();
        assert_eq!(
            operations[0].summary(),
            "composer update contao/news-bundle --with-all-dependencies --no-interaction --no-progress --dry-run"
        );
    }

    #[test]
    fn test_unknown_task_name() {
        let config = TaskConfig::new("composer/remove");
        let err = build_operations(&config, &env(), &ManagerConfig::default()).err().unwrap();
        assert!(err.to_string().contains("Unknown task 'composer/remove'"));
    }
}
