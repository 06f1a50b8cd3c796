//! Launchd service manager for macOS systems

use crate::codec::{DescriptorCodec, LaunchdCodec};
use crate::service_managers::{
    error::ServiceError,
    host::Scope,
    paths::{launchd_default_log_paths, launchd_plist_path},
    patterns::{classify, Outcome, PhraseRule},
    read_config, remove_config,
    runner::{run_logged, CommandOutput},
    status::parse_launchctl_list,
    write_config, Collaborators, Engine, FileSource, ServiceManager,
};
use crate::types::{descriptor::validate_name, LogTarget, ServiceDescriptor, ServiceInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, error};

const ENGINE: Engine = Engine::Launchd;

/// `launchctl load` reports most problems on its output while exiting zero,
/// so its output is always inspected.
const LOAD_RULES: &[PhraseRule] = &[
    PhraseRule::new(&["No such file or directory"], Outcome::DoesNotExist),
    PhraseRule::new(&["Invalid property list"], Outcome::ConfigError),
    PhraseRule::new(&["service already loaded"], Outcome::Success),
];

const UNLOAD_RULES: &[PhraseRule] = &[
    PhraseRule::new(&["Could not find specified service"], Outcome::DoesNotExist),
    PhraseRule::new(&["No such file or directory"], Outcome::DoesNotExist),
];

pub struct LaunchdService {
    descriptor: ServiceDescriptor,
    source: FileSource,
    codec: LaunchdCodec,
    deps: Collaborators,
}

impl LaunchdService {
    pub fn new(descriptor: ServiceDescriptor, deps: Collaborators) -> Self {
        debug!(engine = ENGINE.as_str(), descriptor = ?descriptor, "service from descriptor");
        Self {
            descriptor,
            source: FileSource::Descriptor,
            codec: LaunchdCodec::new(),
            deps,
        }
    }

    pub fn from_raw_template(
        name: &str,
        template: String,
        deps: Collaborators,
    ) -> Result<Self, ServiceError> {
        validate_name(name)?;
        debug!(engine = ENGINE.as_str(), "service from template: {}", template);

        let codec = LaunchdCodec::new();
        let mut descriptor = codec.decode(name, &template);
        // The file name is what every path and launchctl call is keyed on.
        descriptor.name = name.to_string();
        Ok(Self {
            descriptor,
            source: FileSource::RawTemplate(template),
            codec,
            deps,
        })
    }

    pub async fn from_name(name: &str, deps: Collaborators) -> Result<Self, ServiceError> {
        validate_name(name)?;
        let scope = deps.host.scope()?;

        match read_config(&[launchd_plist_path(name, &scope)]).await? {
            Some((path, content)) => {
                debug!(engine = ENGINE.as_str(), "adopting {}", path.display());
                Self::from_raw_template(name, content, deps)
            }
            None => Err(ServiceError::does_not_exist(name)),
        }
    }

    fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The descriptor as it would be written now: `Default` log targets
    /// point at the log directory of the current scope. Raw templates are
    /// returned untouched.
    pub fn resolved_descriptor(&self) -> Result<ServiceDescriptor, ServiceError> {
        match &self.source {
            FileSource::Descriptor => {
                let scope = self.deps.host.scope()?;
                Ok(resolve_default_logs(self.descriptor.clone(), &scope))
            }
            FileSource::RawTemplate(_) => Ok(self.descriptor.clone()),
        }
    }

    async fn launchctl(&self, args: &[&str]) -> Result<CommandOutput, ServiceError> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        run_logged(
            self.deps.runner.as_ref(),
            ENGINE.as_str(),
            &self.deps.launchctl,
            &args,
        )
        .await
    }

    /// Run a launchctl subcommand whose result carries no meaning.
    async fn launchctl_best_effort(&self, args: &[&str]) {
        match self.launchctl(args).await {
            Ok(output) if !output.success => {
                debug!(engine = ENGINE.as_str(), "ignoring failed launchctl {}", args.join(" "))
            }
            Ok(_) => {}
            Err(e) => debug!(engine = ENGINE.as_str(), error = %e, "ignoring launchctl error"),
        }
    }
}

/// Point `Default` log targets at the per-service log directory.
fn resolve_default_logs(mut descriptor: ServiceDescriptor, scope: &Scope) -> ServiceDescriptor {
    let (stdout, stderr) = launchd_default_log_paths(&descriptor.name, scope);
    if descriptor.logging.stdout.is_default() {
        descriptor.logging.stdout = LogTarget::Path(stdout);
    }
    if descriptor.logging.stderr.is_default() {
        descriptor.logging.stderr = LogTarget::Path(stderr);
    }
    descriptor
}

#[async_trait]
impl ServiceManager for LaunchdService {
    fn engine(&self) -> Engine {
        ENGINE
    }

    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn file_path(&self) -> Result<PathBuf, ServiceError> {
        let scope = self.deps.host.scope()?;
        Ok(launchd_plist_path(self.name(), &scope))
    }

    fn render(&self) -> Result<String, ServiceError> {
        match &self.source {
            FileSource::Descriptor => {
                let descriptor = self.resolved_descriptor()?;
                descriptor.validate()?;
                self.codec.encode(&descriptor)
            }
            FileSource::RawTemplate(template) => Ok(template.clone()),
        }
    }

    async fn install(&self) -> Result<(), ServiceError> {
        let path = self.file_path()?;
        debug!(engine = ENGINE.as_str(), service = self.name(), "generating plist file");
        let content = self.render()?;
        let descriptor = self.resolved_descriptor()?;

        // launchd opens log files but does not create their directories.
        for target in [&descriptor.logging.stdout, &descriptor.logging.stderr] {
            if let Some(dir) = target.path().and_then(|p| p.parent()) {
                debug!(engine = ENGINE.as_str(), "making sure log folder exists: {}", dir.display());
                fs::create_dir_all(dir).await?;
            }
        }

        write_config(ENGINE, &path, &content).await
    }

    async fn uninstall(&self) -> Result<(), ServiceError> {
        debug!(engine = ENGINE.as_str(), service = self.name(), "attempting to uninstall");

        match self.stop().await {
            Ok(()) => {}
            Err(e) if e.is_does_not_exist() => {
                debug!(engine = ENGINE.as_str(), "service was not loaded")
            }
            Err(e) => return Err(e),
        }

        remove_config(ENGINE, &self.file_path()?).await?;
        self.launchctl_best_effort(&["remove", self.name()]).await;
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let name = self.name();
        let path = self.file_path()?.to_string_lossy().into_owned();

        let output = self.launchctl(&["load", "-w", path.as_str()]).await?;
        match classify(LOAD_RULES, &output.combined()) {
            Some(Outcome::Success) => {
                debug!(engine = ENGINE.as_str(), service = name, "service already loaded");
                return Ok(());
            }
            Some(outcome) => return outcome.into_result(name, &output),
            None if !output.success => return Err(output.to_error()),
            None => {}
        }

        self.launchctl_best_effort(&["start", name]).await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let name = self.name();
        let path = self.file_path()?.to_string_lossy().into_owned();

        self.launchctl_best_effort(&["stop", name]).await;

        let output = self.launchctl(&["unload", path.as_str()]).await?;
        match classify(UNLOAD_RULES, &output.combined()) {
            Some(outcome) => outcome.into_result(name, &output),
            None => output.into_result().map(|_| ()),
        }
    }

    async fn info(&self) -> ServiceInfo {
        let name = self.name();
        let path = match self.file_path() {
            Ok(path) => path,
            Err(e) => {
                let mut info = ServiceInfo::new(self.descriptor.clone(), PathBuf::new());
                info.error = Some(e);
                return info;
            }
        };

        let descriptor = self
            .resolved_descriptor()
            .unwrap_or_else(|_| self.descriptor.clone());
        let mut info = ServiceInfo::new(descriptor, path.clone());
        match read_config(&[path]).await {
            Ok(Some((_, content))) => info.file_content = content,
            Ok(None) => info.error = Some(ServiceError::does_not_exist(name)),
            Err(e) => info.error = Some(e),
        }

        let output = match self.launchctl(&["list"]).await.and_then(CommandOutput::into_result) {
            Ok(output) => output,
            Err(e) => {
                error!(engine = ENGINE.as_str(), error = %e, "error getting launchctl status");
                info.error = Some(e);
                return info;
            }
        };

        let status = parse_launchctl_list(&output.stdout, name);
        info.is_running = status.running;
        info.pid = status.pid;
        info
    }
}
