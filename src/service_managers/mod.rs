//! Service lifecycle management over native init systems
//!
//! A `ServiceManager` drives one service through install, start, stop,
//! uninstall and inspection against systemd or launchd. Drivers shell out to
//! the engine's control tool through a `CommandRunner` and resolve paths
//! through a `HostContext`, both of which are injectable.

use crate::codec::{DescriptorCodec, LaunchdCodec, SystemdCodec};
use crate::types::{ServiceDescriptor, ServiceInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

pub mod error;
pub mod host;
pub mod launchd;
pub mod paths;
pub mod patterns;
pub mod runner;
pub mod status;
pub mod systemd;

pub use error::ServiceError;
pub use host::{FixedHost, HostContext, Scope, SystemHost};
pub use launchd::LaunchdService;
pub use runner::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use systemd::SystemdService;

pub const DEFAULT_SYSTEMCTL: &str = "systemctl";
pub const DEFAULT_LAUNCHCTL: &str = "launchctl";

/// Uniform lifecycle over one service, whatever the engine.
///
/// Operations are stateless between calls: every one re-reads the host
/// context and the filesystem, so results always reflect the live system.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    fn engine(&self) -> Engine;

    /// The descriptor this instance was built from, or decoded from the
    /// adopted file.
    fn descriptor(&self) -> &ServiceDescriptor;

    /// Where `install` writes the configuration file for the current scope.
    fn file_path(&self) -> Result<PathBuf, ServiceError>;

    /// The file content `install` would write.
    fn render(&self) -> Result<String, ServiceError>;

    /// Write the configuration file. Does not register or start anything.
    async fn install(&self) -> Result<(), ServiceError>;

    /// Stop the service if needed and remove its configuration file.
    /// Removing an absent service succeeds.
    async fn uninstall(&self) -> Result<(), ServiceError>;

    /// Register the installed file with the engine and launch the service.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stop the service and unregister it.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Snapshot of the service's state. Never fails; problems are recorded
    /// in `ServiceInfo::error`.
    async fn info(&self) -> ServiceInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Systemd,
    Launchd,
}

impl Engine {
    /// The engine native to the operating system this binary runs on.
    pub fn detect() -> Result<Self, ServiceError> {
        match std::env::consts::OS {
            "linux" => Ok(Engine::Systemd),
            "macos" => Ok(Engine::Launchd),
            other => Err(ServiceError::UnsupportedEngine(format!(
                "no service engine for operating system {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Systemd => "systemd",
            Engine::Launchd => "launchd",
        }
    }

    pub fn codec(&self) -> Box<dyn DescriptorCodec> {
        match self {
            Engine::Systemd => Box::new(SystemdCodec::new()),
            Engine::Launchd => Box::new(LaunchdCodec::new()),
        }
    }

    pub fn control_program<'a>(&self, deps: &'a Collaborators) -> &'a str {
        match self {
            Engine::Systemd => &deps.systemctl,
            Engine::Launchd => &deps.launchctl,
        }
    }

    /// Whether the engine's control tool can be found on `PATH`.
    pub fn is_available(&self, deps: &Collaborators) -> bool {
        which::which(self.control_program(deps)).is_ok()
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "systemd" => Ok(Engine::Systemd),
            "launchd" => Ok(Engine::Launchd),
            other => Err(ServiceError::UnsupportedEngine(other.to_string())),
        }
    }
}

/// What drivers talk to outside themselves.
#[derive(Clone)]
pub struct Collaborators {
    pub runner: Arc<dyn CommandRunner>,
    pub host: Arc<dyn HostContext>,
    pub systemctl: String,
    pub launchctl: String,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            runner: Arc::new(TokioCommandRunner),
            host: Arc::new(SystemHost),
            systemctl: DEFAULT_SYSTEMCTL.to_string(),
            launchctl: DEFAULT_LAUNCHCTL.to_string(),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("systemctl", &self.systemctl)
            .field("launchctl", &self.launchctl)
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn HostContext>) -> Self {
        self.host = host;
        self
    }
}

/// Where the file content written by `install` comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FileSource {
    /// Encode the descriptor.
    Descriptor,
    /// Write this text back verbatim.
    RawTemplate(String),
}

/// A manager that installs `descriptor` as given.
pub fn from_descriptor(
    engine: Engine,
    descriptor: ServiceDescriptor,
    deps: &Collaborators,
) -> Box<dyn ServiceManager> {
    match engine {
        Engine::Systemd => Box::new(SystemdService::new(descriptor, deps.clone())),
        Engine::Launchd => Box::new(LaunchdService::new(descriptor, deps.clone())),
    }
}

/// Adopt an installed service by reading its configuration file.
/// Fails with `DoesNotExist` when no file is found.
pub async fn from_name(
    engine: Engine,
    name: &str,
    deps: &Collaborators,
) -> Result<Box<dyn ServiceManager>, ServiceError> {
    Ok(match engine {
        Engine::Systemd => Box::new(SystemdService::from_name(name, deps.clone()).await?),
        Engine::Launchd => Box::new(LaunchdService::from_name(name, deps.clone()).await?),
    })
}

/// A manager whose `install` writes `template` verbatim.
pub fn from_raw_template(
    engine: Engine,
    name: &str,
    template: impl Into<String>,
    deps: &Collaborators,
) -> Result<Box<dyn ServiceManager>, ServiceError> {
    let template = template.into();
    Ok(match engine {
        Engine::Systemd => Box::new(SystemdService::from_raw_template(name, template, deps.clone())?),
        Engine::Launchd => Box::new(LaunchdService::from_raw_template(name, template, deps.clone())?),
    })
}

/// Read the first of `paths` that exists with content.
pub(crate) async fn read_config(
    paths: &[PathBuf],
) -> Result<Option<(PathBuf, String)>, ServiceError> {
    for path in paths {
        match fs::read_to_string(path).await {
            Ok(content) if !content.is_empty() => return Ok(Some((path.clone(), content))),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

pub(crate) async fn write_config(
    engine: Engine,
    path: &Path,
    content: &str,
) -> Result<(), ServiceError> {
    if let Some(dir) = path.parent() {
        debug!(engine = engine.as_str(), "making sure folder exists: {}", dir.display());
        fs::create_dir_all(dir).await?;
    }

    debug!(engine = engine.as_str(), "writing {}", path.display());
    fs::write(path, content).await?;
    debug!(engine = engine.as_str(), "wrote {} bytes", content.len());
    Ok(())
}

/// Delete a configuration file. Returns whether a file was removed.
pub(crate) async fn remove_config(engine: Engine, path: &Path) -> Result<bool, ServiceError> {
    debug!(engine = engine.as_str(), "removing {}", path.display());
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
