//! Package-manager subprocess operations

use crate::configs::manager::ManagerConfig;
use crate::environment::Environment;
use crate::execution::command::{ProcessSpec, SubprocessOperation};
use crate::types::{StagerError, StagerResult};

/// Base invocation of the package manager in the project directory
fn composer(config: &ManagerConfig, environment: &Environment) -> StagerResult<ProcessSpec> {
    let spec = ProcessSpec::from_argv(&config.composer_command(), environment.project_dir())
        .ok_or_else(|| StagerError::Configuration("Empty composer command".to_string()))?;
    Ok(spec.env("COMPOSER_NO_INTERACTION", "1"))
}

/// `composer install`
pub fn install(
    config: &ManagerConfig,
    environment: &Environment,
    dry_run: bool,
) -> StagerResult<SubprocessOperation> {
    let mut spec = composer(config, environment)?.args(["install", "--no-interaction", "--no-progress"]);
    if dry_run {
        spec = spec.arg("--dry-run");
    }
    Ok(SubprocessOperation::new("composer-install", spec))
}

/// `composer update`, restricted to `packages` when any are given
pub fn update(
    config: &ManagerConfig,
    environment: &Environment,
    packages: &[String],
    dry_run: bool,
) -> StagerResult<SubprocessOperation> {
    let mut spec = composer(config, environment)?
        .arg("update")
        .args(packages.iter().cloned())
        .args(["--with-all-dependencies", "--no-interaction", "--no-progress"]);
    if dry_run {
        spec = spec.arg("--dry-run");
    }
    Ok(SubprocessOperation::new("composer-update", spec))
}

/// `composer dump-autoload`
pub fn dump_autoload(
    config: &ManagerConfig,
    environment: &Environment,
) -> StagerResult<SubprocessOperation> {
    let spec = composer(config, environment)?.args(["dump-autoload", "--optimize", "--no-interaction"]);
    Ok(SubprocessOperation::new("dump-autoload", spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::manager::Command;
    use stager_operation_protocol::Operation;

    fn env() -> Environment {
        Environment::new("/srv/app", "/srv/app/public")
    }

    #[test]
    fn test_install_command_line() {
        let op = install(&ManagerConfig::default(), &env(), false).unwrap();
        assert_eq!(op.name(), "composer-install");
        assert_eq!(op.summary(), "composer install --no-interaction --no-progress");

        let op = install(&ManagerConfig::default(), &env(), true).unwrap();
        assert_eq!(op.summary(), "composer install --no-interaction --no-progress --dry-run");
    }

    #[test]
    fn test_update_lists_packages_first() {
        let packages = vec!["contao/news-bundle".to_string(), "contao/faq-bundle".to_string()];
        let op = update(&ManagerConfig::default(), &env(), &packages, false).unwrap();
        assert_eq!(
            op.summary(),
            "composer update contao/news-bundle contao/faq-bundle --with-all-dependencies --no-interaction --no-progress"
        );
    }

    #[test]
    fn test_configured_phar_invocation() {
        let config = ManagerConfig {
            composer: Some(Command::Multiple(vec![
                "php".to_string(),
                "composer.phar".to_string(),
            ])),
            ..Default::default()
        };
        let op = dump_autoload(&config, &env()).unwrap();
        assert_eq!(
            op.summary(),
            "php composer.phar dump-autoload --optimize --no-interaction"
        );
    }
}
