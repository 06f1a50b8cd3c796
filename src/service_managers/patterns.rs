//! Phrase tables that turn control-tool output into typed outcomes
//!
//! The control tools report most conditions only as prose. Each engine keeps
//! one table per subcommand, ordered most specific rule first.

use crate::service_managers::error::ServiceError;
use crate::service_managers::runner::CommandOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    DoesNotExist,
    ConfigError,
}

/// Matches when every phrase occurs somewhere in the output.
#[derive(Debug, Clone, Copy)]
pub struct PhraseRule {
    pub all_of: &'static [&'static str],
    pub outcome: Outcome,
}

impl PhraseRule {
    pub const fn new(all_of: &'static [&'static str], outcome: Outcome) -> Self {
        Self { all_of, outcome }
    }

    pub fn matches(&self, text: &str) -> bool {
        !self.all_of.is_empty() && self.all_of.iter().all(|phrase| text.contains(phrase))
    }
}

/// First matching rule wins.
pub fn classify(rules: &[PhraseRule], text: &str) -> Option<Outcome> {
    rules
        .iter()
        .find(|rule| rule.matches(text))
        .map(|rule| rule.outcome)
}

impl Outcome {
    pub fn into_result(self, name: &str, output: &CommandOutput) -> Result<(), ServiceError> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::DoesNotExist => Err(ServiceError::does_not_exist(name)),
            Outcome::ConfigError => Err(ServiceError::ConfigError {
                name: name.to_string(),
                detail: output.combined().trim().to_string(),
            }),
        }
    }
}

/// Interpret a command that is only inspected when it exits non-zero:
/// known phrases become their outcome, anything else a `CommandFailed`.
pub fn check_failure(
    rules: &[PhraseRule],
    name: &str,
    output: &CommandOutput,
) -> Result<(), ServiceError> {
    if output.success {
        return Ok(());
    }
    match classify(rules, &output.combined()) {
        Some(outcome) => outcome.into_result(name, output),
        None => Err(output.to_error()),
    }
}
