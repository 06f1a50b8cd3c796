//! Engine-neutral service descriptor

use crate::service_managers::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Describes a background service independently of the native manager that
/// will run it. The name doubles as the on-disk file stem and as the
/// identifier passed to every native command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDescriptor {
    pub name: String,
    pub description: String,
    pub documentation: String,
    pub executable: String,
    pub args: Vec<String>,
    pub working_directory: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub run_at_load: bool,
    pub restart: RestartPolicy,
    pub restart_delay_secs: Option<u64>,
    pub credentials: Credentials,
    pub logging: Logging,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub user: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub stdout: LogTarget,
    pub stderr: LogTarget,
}

/// Where one output stream of the service goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTarget {
    /// Let the engine pick: launchd derives a file under its log directory,
    /// systemd leaves the stream to the journal.
    #[default]
    Default,
    Disabled,
    Path(PathBuf),
}

impl LogTarget {
    pub fn is_default(&self) -> bool {
        matches!(self, LogTarget::Default)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            LogTarget::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_run_at_load(mut self, run_at_load: bool) -> Self {
        self.run_at_load = run_at_load;
        self
    }

    pub fn with_logging(mut self, stdout: LogTarget, stderr: LogTarget) -> Self {
        self.logging = Logging { stdout, stderr };
        self
    }

    /// Load a descriptor from a YAML or JSON file, picked by extension.
    pub fn from_file(path: &Path) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path)?;
        let descriptor: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?,
            _ => serde_yaml::from_str(&content)
                .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Reject descriptors that neither native format can carry. Both formats
    /// are line oriented, so no value may contain a line break. Values that
    /// unit files store unquoted lose edge whitespace to systemd's parser, so
    /// those must be trimmed already.
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_name(&self.name)?;

        for key in self.environment.keys() {
            if key.is_empty() || key.contains('=') || key.chars().any(char::is_whitespace) {
                return Err(invalid(format!("invalid environment variable name {key:?}")));
            }
        }

        let log_paths: Vec<(&str, Cow<'_, str>)> = [
            ("logging.stdout", &self.logging.stdout),
            ("logging.stderr", &self.logging.stderr),
        ]
        .into_iter()
        .filter_map(|(field, target)| target.path().map(|p| (field, p.to_string_lossy())))
        .collect();

        let mut values: Vec<(&str, &str)> = vec![
            ("description", self.description.as_str()),
            ("documentation", self.documentation.as_str()),
            ("executable", self.executable.as_str()),
        ];
        values.extend(self.args.iter().map(|a| ("args", a.as_str())));
        values.extend(self.environment.values().map(|v| ("environment", v.as_str())));
        if let Some(dir) = &self.working_directory {
            values.push(("working_directory", dir.as_str()));
        }
        if let Some(user) = &self.credentials.user {
            values.push(("user", user.as_str()));
        }
        if let Some(group) = &self.credentials.group {
            values.push(("group", group.as_str()));
        }
        values.extend(log_paths.iter().map(|(field, path)| (*field, &**path)));

        for (field, value) in values {
            if value.contains(&['\n', '\r', '\0'][..]) {
                return Err(invalid(format!("{field} contains a line break or NUL")));
            }
            if UNQUOTED_FIELDS.contains(&field) && value.trim() != value {
                return Err(invalid(format!(
                    "{field} has leading or trailing whitespace"
                )));
            }
        }

        Ok(())
    }
}

const UNQUOTED_FIELDS: &[&str] = &[
    "description",
    "documentation",
    "working_directory",
    "user",
    "group",
    "logging.stdout",
    "logging.stderr",
];

/// Service names become file names, so they must be a single path component.
pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(invalid("service name is empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid(format!("service name {name:?} is not a file name")));
    }
    if name.chars().any(|c| c == '/' || c == '\0' || c.is_whitespace()) {
        return Err(invalid(format!(
            "service name {name:?} must not contain '/', whitespace or NUL"
        )));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> ServiceError {
    ServiceError::InvalidDescriptor {
        reason: reason.into(),
    }
}
