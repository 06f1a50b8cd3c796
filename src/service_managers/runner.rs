//! Invocation of native control tools

use crate::service_managers::error::ServiceError;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one control-tool invocation. A non-zero exit is data,
/// not an error: drivers decide what it means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub program: String,
    pub args: Vec<String>,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr; the tools are not consistent about which
    /// stream carries their complaints.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }

    pub fn to_error(&self) -> ServiceError {
        ServiceError::CommandFailed {
            program: self.program.clone(),
            args: self.args.clone(),
            exit_code: self.exit_code,
            output: self.combined().trim().to_string(),
        }
    }

    /// `Ok(self)` on a zero exit status, `CommandFailed` otherwise.
    pub fn into_result(self) -> Result<Self, ServiceError> {
        if self.success {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion. Only failures to spawn or
    /// wait for the process are errors.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        let output = Command::new(program).args(args).output().await?;

        Ok(CommandOutput {
            program: program.to_string(),
            args: args.to_vec(),
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Run through `runner`, logging the invocation and its output under `engine`.
pub async fn run_logged(
    runner: &dyn CommandRunner,
    engine: &str,
    program: &str,
    args: &[String],
) -> Result<CommandOutput, ServiceError> {
    debug!(engine, "run: {} {}", program, args.join(" "));

    let result = runner.run(program, args).await;
    match &result {
        Ok(output) => debug!(
            engine,
            success = output.success,
            exit_code = ?output.exit_code,
            stdout = %output.stdout.trim(),
            stderr = %output.stderr.trim(),
            "command finished"
        ),
        Err(e) => debug!(engine, error = %e, "command could not be run"),
    }
    result
}
