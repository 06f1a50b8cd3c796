//! Systemd service manager for Linux systems

use crate::codec::{DescriptorCodec, SystemdCodec};
use crate::service_managers::{
    error::ServiceError,
    paths::{systemd_unit_candidates, systemd_unit_path},
    patterns::{check_failure, classify, Outcome, PhraseRule},
    read_config, remove_config,
    runner::{run_logged, CommandOutput},
    status::parse_systemctl_status,
    write_config, Collaborators, Engine, FileSource, ServiceManager,
};
use crate::types::{descriptor::validate_name, ServiceDescriptor, ServiceInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

const ENGINE: Engine = Engine::Systemd;

const ENABLE_RULES: &[PhraseRule] = &[PhraseRule::new(
    &["Failed to enable unit", "does not exist"],
    Outcome::DoesNotExist,
)];

const START_RULES: &[PhraseRule] = &[PhraseRule::new(
    &["Failed to start", "not found"],
    Outcome::DoesNotExist,
)];

const STOP_RULES: &[PhraseRule] = &[PhraseRule::new(
    &["Failed to stop", "not loaded"],
    Outcome::DoesNotExist,
)];

const DISABLE_RULES: &[PhraseRule] = &[
    PhraseRule::new(&["Failed to disable", "does not exist"], Outcome::DoesNotExist),
    PhraseRule::new(&["Removed"], Outcome::Success),
];

pub struct SystemdService {
    descriptor: ServiceDescriptor,
    source: FileSource,
    codec: SystemdCodec,
    deps: Collaborators,
}

impl SystemdService {
    pub fn new(descriptor: ServiceDescriptor, deps: Collaborators) -> Self {
        debug!(engine = ENGINE.as_str(), descriptor = ?descriptor, "service from descriptor");
        Self {
            descriptor,
            source: FileSource::Descriptor,
            codec: SystemdCodec::new(),
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

        let codec = SystemdCodec::new();
        let descriptor = codec.decode(name, &template);
        Ok(Self {
            descriptor,
            source: FileSource::RawTemplate(template),
            codec,
            deps,
        })
    }

    /// Adopt the unit file installed for `name`. As root, units shipped in
    /// the vendor directory are found too.
    pub async fn from_name(name: &str, deps: Collaborators) -> Result<Self, ServiceError> {
        validate_name(name)?;
        let scope = deps.host.scope()?;

        match read_config(&systemd_unit_candidates(name, &scope)).await? {
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

    /// Run systemctl, scoped to the user manager when not root.
    async fn systemctl(&self, args: &[&str]) -> Result<CommandOutput, ServiceError> {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        if !self.deps.host.is_root() {
            full_args.push("--user".to_string());
        }
        full_args.extend(args.iter().map(|arg| arg.to_string()));

        run_logged(
            self.deps.runner.as_ref(),
            ENGINE.as_str(),
            &self.deps.systemctl,
            &full_args,
        )
        .await
    }

    async fn daemon_reload(&self) -> Result<(), ServiceError> {
        debug!(engine = ENGINE.as_str(), "reloading daemon");
        self.systemctl(&["daemon-reload"]).await?.into_result()?;
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for SystemdService {
    fn engine(&self) -> Engine {
        ENGINE
    }

    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn file_path(&self) -> Result<PathBuf, ServiceError> {
        let scope = self.deps.host.scope()?;
        Ok(systemd_unit_path(self.name(), &scope))
    }

    fn render(&self) -> Result<String, ServiceError> {
        match &self.source {
            FileSource::Descriptor => {
                self.descriptor.validate()?;
                self.codec.encode(&self.descriptor)
            }
            FileSource::RawTemplate(template) => Ok(template.clone()),
        }
    }

    async fn install(&self) -> Result<(), ServiceError> {
        let path = self.file_path()?;
        debug!(engine = ENGINE.as_str(), service = self.name(), "generating unit file");
        let content = self.render()?;
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
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let name = self.name();
        self.daemon_reload().await?;

        debug!(engine = ENGINE.as_str(), service = name, "enabling unit");
        let output = self.systemctl(&["enable", name]).await?;
        check_failure(ENABLE_RULES, name, &output)?;

        debug!(engine = ENGINE.as_str(), service = name, "starting unit");
        let output = self.systemctl(&["start", name]).await?;
        check_failure(START_RULES, name, &output)
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let name = self.name();
        self.daemon_reload().await?;

        debug!(engine = ENGINE.as_str(), service = name, "stopping unit");
        let output = self.systemctl(&["stop", name]).await?;
        check_failure(STOP_RULES, name, &output)?;

        debug!(engine = ENGINE.as_str(), service = name, "disabling unit");
        let output = self.systemctl(&["disable", name]).await?;
        if !output.success {
            warn!(engine = ENGINE.as_str(), service = name, "disabling unit failed");
            return match classify(DISABLE_RULES, &output.combined()) {
                Some(outcome) => outcome.into_result(name, &output),
                None => Err(output.to_error()),
            };
        }

        self.daemon_reload().await?;

        debug!(engine = ENGINE.as_str(), "running reset-failed");
        self.systemctl(&["reset-failed"]).await?.into_result()?;
        Ok(())
    }

    async fn info(&self) -> ServiceInfo {
        let name = self.name();
        let scope = match self.deps.host.scope() {
            Ok(scope) => scope,
            Err(e) => {
                let mut info = ServiceInfo::new(self.descriptor.clone(), PathBuf::new());
                info.error = Some(e);
                return info;
            }
        };

        let mut info = ServiceInfo::new(self.descriptor.clone(), systemd_unit_path(name, &scope));
        match read_config(&systemd_unit_candidates(name, &scope)).await {
            Ok(Some((path, content))) => {
                info.file_path = path;
                info.file_content = content;
            }
            Ok(None) => info.error = Some(ServiceError::does_not_exist(name)),
            Err(e) => info.error = Some(e),
        }

        let output = match self.systemctl(&["status", name]).await {
            Ok(output) => output,
            Err(e) => {
                info.error = Some(e);
                return info;
            }
        };

        // `status` exits non-zero for any unit that is not running; only an
        // exit without a status report is a failure.
        match parse_systemctl_status(name, &output.combined()) {
            Ok(status) => {
                info.is_running = status.running;
                info.pid = status.pid;
                if !output.success && !status.reported {
                    info.error = Some(output.to_error());
                }
            }
            Err(e) => info.error = Some(e),
        }
        info
    }
}
