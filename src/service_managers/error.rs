use thiserror::Error;

/// Errors surfaced by service lifecycle operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The config file or the manager registration is absent.
    #[error("Service does not exist: {name}")]
    DoesNotExist { name: String },

    /// The native manager rejected the on-disk configuration.
    #[error("Service configuration rejected for {name}: {detail}")]
    ConfigError { name: String, detail: String },

    #[error("Command `{program} {}` failed (exit code {exit_code:?}): {output}", .args.join(" "))]
    CommandFailed {
        program: String,
        args: Vec<String>,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Invalid service descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    #[error("Could not determine the home directory of the current user")]
    HomeDirUnavailable,

    #[error("Unsupported service engine: {0}")]
    UnsupportedEngine(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    pub fn does_not_exist(name: impl Into<String>) -> Self {
        ServiceError::DoesNotExist { name: name.into() }
    }

    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, ServiceError::DoesNotExist { .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, ServiceError::ConfigError { .. })
    }

    /// Stable identifier for diagnostics output.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::DoesNotExist { .. } => "service_does_not_exist",
            ServiceError::ConfigError { .. } => "service_config_error",
            ServiceError::CommandFailed { .. } => "command_failed",
            ServiceError::Io(_) => "io",
            ServiceError::Template(_) => "template",
            ServiceError::InvalidDescriptor { .. } => "invalid_descriptor",
            ServiceError::HomeDirUnavailable => "home_dir_unavailable",
            ServiceError::UnsupportedEngine(_) => "unsupported_engine",
            ServiceError::Config(_) => "config",
        }
    }
}

impl From<handlebars::RenderError> for ServiceError {
    fn from(err: handlebars::RenderError) -> Self {
        ServiceError::Template(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
