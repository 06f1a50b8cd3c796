//! Manager configuration file

use crate::service_managers::{
    Collaborators, Engine, ServiceError, DEFAULT_LAUNCHCTL, DEFAULT_SYSTEMCTL,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Engine to drive; detected from the operating system when unset.
    pub engine: Option<Engine>,
    pub systemctl: String,
    pub launchctl: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            engine: None,
            systemctl: DEFAULT_SYSTEMCTL.to_string(),
            launchctl: DEFAULT_LAUNCHCTL.to_string(),
        }
    }
}

impl ManagerConfig {
    /// Load from a YAML or JSON file, picked by extension.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        debug!("loading manager config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let parsed: Result<Self, String> = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))
    }

    pub fn with_engine(mut self, engine: Option<Engine>) -> Self {
        if engine.is_some() {
            self.engine = engine;
        }
        self
    }

    /// The configured engine, or the one native to this operating system.
    pub fn resolve_engine(&self) -> Result<Engine, ServiceError> {
        let engine = match self.engine {
            Some(engine) => engine,
            None => Engine::detect()?,
        };

        if !engine.is_available(&self.collaborators()) {
            warn!(
                "{} not found on PATH, {} operations will fail",
                engine.control_program(&self.collaborators()),
                engine
            );
        }
        Ok(engine)
    }

    /// The real command runner and host context, with the configured tool names.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            systemctl: self.systemctl.clone(),
            launchctl: self.launchctl.clone(),
            ..Collaborators::default()
        }
    }
}
