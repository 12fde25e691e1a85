//! Bootstrap conventions of the managed platform
//!
//! The platform changed how a fresh installation is initialised at 4.12: the
//! public directory became configurable and initialisation moved from a
//! script handler class to a setup binary. Both conventions stay supported.
//! They are kept in [`BOOTSTRAP_POLICIES`], ordered newest first; adding a
//! further convention is one more table row.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::types::StagerError;

/// `major.minor` version selector, optionally with a patch component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: 0,
        }
    }
}

impl FromStr for PlatformVersion {
    type Err = StagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StagerError::Configuration(format!("Invalid version selector '{}'", s));

        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, StagerError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };

        let version = Self {
            major: next(true)?,
            minor: next(true)?,
            patch: next(false)?,
        };

        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl PartialOrd for PlatformVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlatformVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

/// Where the generated manifest points the public directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicDirStrategy {
    /// Basename of the configured public directory
    ConfiguredBasename,
    /// A fixed directory name
    Fixed(&'static str),
}

/// One bootstrap convention, valid from `since` until the next newer row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapPolicy {
    pub since: PlatformVersion,
    pub public_dir: PublicDirStrategy,
    /// Run after `install` and `update`
    pub script: &'static str,
}

/// Known conventions, newest first
pub const BOOTSTRAP_POLICIES: &[BootstrapPolicy] = &[
    BootstrapPolicy {
        since: PlatformVersion::new(4, 12),
        public_dir: PublicDirStrategy::ConfiguredBasename,
        script: "@php vendor/bin/contao-setup",
    },
    BootstrapPolicy {
        since: PlatformVersion::new(0, 0),
        public_dir: PublicDirStrategy::Fixed("web"),
        script: "Contao\\ManagerBundle\\Composer\\ScriptHandler::initializeApplication",
    },
];

/// Pick the convention for `version`
pub fn policy_for(version: PlatformVersion) -> &'static BootstrapPolicy {
    BOOTSTRAP_POLICIES
        .iter()
        .find(|policy| version >= policy.since)
        .unwrap_or(&BOOTSTRAP_POLICIES[BOOTSTRAP_POLICIES.len() - 1])
}

impl BootstrapPolicy {
    /// Value for `extra.public-dir`
    pub fn public_dir_name(&self, configured_public_dir: &Path) -> String {
        match self.public_dir {
            PublicDirStrategy::ConfiguredBasename => configured_public_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "public".to_string()),
            PublicDirStrategy::Fixed(name) => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PlatformVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(v("4.13"), PlatformVersion::new(4, 13));
        assert_eq!(v("4.9.3").patch, 3);
        assert_eq!(v("4.13").to_string(), "4.13");
        assert_eq!(v("4.9.3").to_string(), "4.9.3");
        assert!("4".parse::<PlatformVersion>().is_err());
        assert!("4.x".parse::<PlatformVersion>().is_err());
        assert!("4.13.1.2".parse::<PlatformVersion>().is_err());
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("4.13") > v("4.12"));
        assert!(v("4.9") < v("4.12"));
        assert!(v("5.0") > v("4.13"));
    }

    #[test]
    fn test_policy_selection_at_threshold() {
        assert_eq!(policy_for(v("4.12")).script, "@php vendor/bin/contao-setup");
        assert_eq!(policy_for(v("4.13")).script, "@php vendor/bin/contao-setup");
        assert_eq!(
            policy_for(v("4.11")).script,
            "Contao\\ManagerBundle\\Composer\\ScriptHandler::initializeApplication"
        );
        assert_eq!(policy_for(v("4.4")).public_dir, PublicDirStrategy::Fixed("web"));
    }

    #[test]
    fn test_public_dir_name() {
        let modern = policy_for(v("4.13"));
        assert_eq!(modern.public_dir_name(Path::new("/srv/app/htdocs")), "htdocs");

        let legacy = policy_for(v("4.4"));
        assert_eq!(legacy.public_dir_name(Path::new("/srv/app/htdocs")), "web");
    }

    #[test]
    fn test_table_is_ordered_newest_first() {
        for pair in BOOTSTRAP_POLICIES.windows(2) {
            assert!(pair[0].since > pair[1].since);
        }
    }
}
