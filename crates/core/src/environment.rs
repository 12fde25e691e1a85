//! Read-only view of the target project
//!
//! [`Environment`] knows where the manifest, lockfile and vendor directory of
//! the project live and answers questions about the declared packages. It
//! never writes; operations that change the project do so through their own
//! code paths.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::configs::manager::ManagerConfig;
use crate::locker::Locker;
use crate::types::StagerResult;

pub const MANIFEST_FILE: &str = "composer.json";
pub const LOCK_FILE: &str = "composer.lock";
pub const VENDOR_DIR: &str = "vendor";

/// Paths of the project being managed
#[derive(Debug, Clone)]
pub struct Environment {
    project_dir: PathBuf,
    public_dir: PathBuf,
}

impl Environment {
    pub fn new(project_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            public_dir: public_dir.into(),
        }
    }

    /// Build the environment for `project_dir` with the public directory taken from config
    pub fn from_config(project_dir: &Path, config: &ManagerConfig) -> Self {
        Self::new(project_dir, project_dir.join(config.public_dir()))
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn json_file(&self) -> PathBuf {
        self.project_dir.join(MANIFEST_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.project_dir.join(LOCK_FILE)
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.project_dir.join(VENDOR_DIR)
    }

    /// Raw manifest contents
    pub fn manifest_contents(&self) -> StagerResult<String> {
        Ok(std::fs::read_to_string(self.json_file())?)
    }

    /// Parsed manifest
    pub fn manifest(&self) -> StagerResult<Value> {
        Ok(serde_json::from_str(&self.manifest_contents()?)?)
    }

    /// Lock inspection bound to this project's manifest and lockfile
    pub fn locker(&self) -> Locker {
        Locker::new(self.json_file(), self.lock_file())
    }
}

/// Facts about the hosting setup
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    php_executable: Option<PathBuf>,
}

impl ServerInfo {
    pub fn new(php_executable: Option<PathBuf>) -> Self {
        Self { php_executable }
    }

    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::new(config.php_executable.clone())
    }

    /// Configured PHP binary, `None` when the hosting configuration is incomplete
    pub fn php_executable(&self) -> Option<&Path> {
        self.php_executable
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_relative_to_project_dir() {
        let env = Environment::new("/srv/app", "/srv/app/public");
        assert_eq!(env.json_file(), PathBuf::from("/srv/app/composer.json"));
        assert_eq!(env.lock_file(), PathBuf::from("/srv/app/composer.lock"));
        assert_eq!(env.vendor_dir(), PathBuf::from("/srv/app/vendor"));
        assert_eq!(env.public_dir(), Path::new("/srv/app/public"));
    }

    #[test]
    fn test_from_config_uses_public_dir_setting() {
        let config = ManagerConfig {
            public_dir: Some("web".to_string()),
            ..ManagerConfig::default()
        };
        let env = Environment::from_config(Path::new("/srv/app"), &config);
        assert_eq!(env.public_dir(), Path::new("/srv/app/web"));
    }

    #[test]
    fn test_empty_php_executable_counts_as_missing() {
        assert!(ServerInfo::new(Some(PathBuf::new())).php_executable().is_none());
        assert!(ServerInfo::default().php_executable().is_none());
        assert_eq!(
            ServerInfo::new(Some(PathBuf::from("/usr/bin/php"))).php_executable(),
            Some(Path::new("/usr/bin/php"))
        );
    }
}
