use crate::cli::options::Commands;
use crate::config::ManagerConfig;
use crate::service_managers::{
    self, error::Result, Collaborators, Engine, ServiceError, ServiceManager,
};
use crate::types::{ServiceDescriptor, ServiceInfo};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a CLI command produced, for the output layer to print.
#[derive(Debug)]
pub enum CommandOutcome {
    Installed { name: String, path: PathBuf },
    Uninstalled { name: String },
    Started { name: String },
    Stopped { name: String },
    Info { info: Box<ServiceInfo>, json: bool },
    Rendered { content: String },
}

/// Main rustle-service CLI implementation
pub struct RustleServiceCliImpl {
    engine: Engine,
    deps: Collaborators,
}

impl RustleServiceCliImpl {
    pub fn new(config: &ManagerConfig) -> Result<Self> {
        let engine = config.resolve_engine()?;
        info!("Using {} service engine", engine);
        Ok(Self::with_collaborators(engine, config.collaborators()))
    }

    pub fn with_collaborators(engine: Engine, deps: Collaborators) -> Self {
        Self { engine, deps }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub async fn execute(&self, command: &Commands) -> Result<CommandOutcome> {
        match command {
            Commands::Install {
                descriptor: Some(path),
                ..
            } => {
                let manager = self.from_descriptor_file(path)?;
                self.install(manager.as_ref()).await
            }
            Commands::Install {
                name: Some(name),
                template: Some(template),
                ..
            } => {
                let text = tokio::fs::read_to_string(template).await?;
                let manager =
                    service_managers::from_raw_template(self.engine, name, text, &self.deps)?;
                self.install(manager.as_ref()).await
            }
            Commands::Install { .. } => Err(ServiceError::Config(
                "install needs --descriptor or --name with --template".to_string(),
            )),
            Commands::Uninstall { name } => {
                self.adopt_or_bare(name).await?.uninstall().await?;
                info!("Uninstalled {}", name);
                Ok(CommandOutcome::Uninstalled { name: name.clone() })
            }
            Commands::Start { name } => {
                self.adopt(name).await?.start().await?;
                info!("Started {}", name);
                Ok(CommandOutcome::Started { name: name.clone() })
            }
            Commands::Stop { name } => {
                self.adopt(name).await?.stop().await?;
                info!("Stopped {}", name);
                Ok(CommandOutcome::Stopped { name: name.clone() })
            }
            Commands::Info { name, json } => {
                let manager = self.adopt_or_bare(name).await?;
                Ok(CommandOutcome::Info {
                    info: Box::new(manager.info().await),
                    json: *json,
                })
            }
            Commands::Render { descriptor } => {
                let manager = self.from_descriptor_file(descriptor)?;
                Ok(CommandOutcome::Rendered {
                    content: manager.render()?,
                })
            }
        }
    }

    fn from_descriptor_file(&self, path: &Path) -> Result<Box<dyn ServiceManager>> {
        let descriptor = ServiceDescriptor::from_file(path)?;
        Ok(service_managers::from_descriptor(
            self.engine,
            descriptor,
            &self.deps,
        ))
    }

    async fn adopt(&self, name: &str) -> Result<Box<dyn ServiceManager>> {
        service_managers::from_name(self.engine, name, &self.deps).await
    }

    /// Adopt `name`, or stand in a bare descriptor when nothing is installed
    /// so that uninstall stays idempotent and info reports DoesNotExist.
    async fn adopt_or_bare(&self, name: &str) -> Result<Box<dyn ServiceManager>> {
        match self.adopt(name).await {
            Err(e) if e.is_does_not_exist() => Ok(service_managers::from_descriptor(
                self.engine,
                ServiceDescriptor {
                    name: name.to_string(),
                    ..Default::default()
                },
                &self.deps,
            )),
            other => other,
        }
    }

    async fn install(&self, manager: &dyn ServiceManager) -> Result<CommandOutcome> {
        let path = manager.file_path()?;
        manager.install().await?;
        info!("Installed {} at {}", manager.descriptor().name, path.display());
        Ok(CommandOutcome::Installed {
            name: manager.descriptor().name.clone(),
            path,
        })
    }
}
