//! Privilege and home-directory context of the calling process

use crate::service_managers::error::ServiceError;
use std::path::PathBuf;

/// Install scope a service operation resolves its paths against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Running as root: system-wide directories.
    System,
    /// Running as a regular user: directories under the user's home.
    User { home: PathBuf },
}

impl Scope {
    pub fn is_root(&self) -> bool {
        matches!(self, Scope::System)
    }
}

/// Answers "who is calling". Drivers consult it on every operation and never
/// cache the answer.
pub trait HostContext: Send + Sync {
    fn is_root(&self) -> bool;

    fn home_dir(&self) -> Result<PathBuf, ServiceError>;

    fn scope(&self) -> Result<Scope, ServiceError> {
        if self.is_root() {
            Ok(Scope::System)
        } else {
            Ok(Scope::User {
                home: self.home_dir()?,
            })
        }
    }
}

/// The real process context: effective UID and `$HOME`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostContext for SystemHost {
    fn is_root(&self) -> bool {
        #[cfg(unix)]
        {
            nix::unistd::geteuid().is_root()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    fn home_dir(&self) -> Result<PathBuf, ServiceError> {
        dirs::home_dir().ok_or(ServiceError::HomeDirUnavailable)
    }
}

/// A context pinned to a given privilege level and home directory.
#[derive(Debug, Clone)]
pub struct FixedHost {
    pub root: bool,
    pub home: PathBuf,
}

impl FixedHost {
    pub fn root() -> Self {
        Self {
            root: true,
            home: PathBuf::from("/root"),
        }
    }

    pub fn user(home: impl Into<PathBuf>) -> Self {
        Self {
            root: false,
            home: home.into(),
        }
    }
}

impl HostContext for FixedHost {
    fn is_root(&self) -> bool {
        self.root
    }

    fn home_dir(&self) -> Result<PathBuf, ServiceError> {
        Ok(self.home.clone())
    }
}
