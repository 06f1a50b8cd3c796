//! systemd unit file codec

use crate::codec::DescriptorCodec;
use crate::service_managers::error::ServiceError;
use crate::types::descriptor::{LogTarget, RestartPolicy, ServiceDescriptor};
use handlebars::Handlebars;
use serde_json::json;
use std::path::PathBuf;

const UNIT_TEMPLATE: &str = r#"[Unit]
Description={{description}}
{{#if has_documentation}}
Documentation={{documentation}}
{{/if}}

[Service]
Type=simple
ExecStart={{exec_start}}
{{#if has_working_directory}}
WorkingDirectory={{working_directory}}
{{/if}}
{{#each environment}}
Environment={{this}}
{{/each}}
{{#if has_user}}
User={{user}}
{{/if}}
{{#if has_group}}
Group={{group}}
{{/if}}
Restart={{restart}}
{{#if has_restart_delay}}
RestartSec={{restart_delay}}
{{/if}}
{{#if stdout}}
StandardOutput={{stdout}}
{{/if}}
{{#if stderr}}
StandardError={{stderr}}
{{/if}}
{{#if run_at_load}}

[Install]
WantedBy=default.target
{{/if}}
"#;

/// Encodes descriptors as systemd service units. The unit name is not stored
/// inside the file; it is the file stem.
pub struct SystemdCodec {
    handlebars: Handlebars<'static>,
}

impl Default for SystemdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemdCodec {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }
}

impl DescriptorCodec for SystemdCodec {
    fn extension(&self) -> &'static str {
        "service"
    }

    fn encode(&self, descriptor: &ServiceDescriptor) -> Result<String, ServiceError> {
        let exec_start = shell_words::join(
            std::iter::once(descriptor.executable.as_str())
                .chain(descriptor.args.iter().map(String::as_str)),
        );

        let environment: Vec<String> = descriptor
            .environment
            .iter()
            .map(|(key, value)| escape(&shell_words::quote(&format!("{key}={value}"))))
            .collect();

        let data = json!({
            "description": escape(&descriptor.description),
            "has_documentation": !descriptor.documentation.is_empty(),
            "documentation": escape(&descriptor.documentation),
            "exec_start": escape(&exec_start),
            "has_working_directory": descriptor.working_directory.is_some(),
            "working_directory": descriptor.working_directory.as_deref().map(escape),
            "environment": environment,
            "has_user": descriptor.credentials.user.is_some(),
            "user": descriptor.credentials.user.as_deref().map(escape),
            "has_group": descriptor.credentials.group.is_some(),
            "group": descriptor.credentials.group.as_deref().map(escape),
            "restart": restart_value(descriptor.restart),
            "has_restart_delay": descriptor.restart_delay_secs.is_some(),
            "restart_delay": descriptor.restart_delay_secs,
            "stdout": log_target_value(&descriptor.logging.stdout),
            "stderr": log_target_value(&descriptor.logging.stderr),
            "run_at_load": descriptor.run_at_load,
        });

        Ok(self.handlebars.render_template(UNIT_TEMPLATE, &data)?)
    }

    fn decode(&self, name: &str, text: &str) -> ServiceDescriptor {
        let mut descriptor = ServiceDescriptor {
            name: name.to_string(),
            ..Default::default()
        };
        let mut section = String::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].to_string();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match (section.as_str(), key) {
                ("Unit", "Description") => descriptor.description = unescape(value),
                ("Unit", "Documentation") => descriptor.documentation = unescape(value),
                ("Service", "ExecStart") => {
                    let mut words = split_words(&unescape(value)).into_iter();
                    descriptor.executable = words.next().unwrap_or_default();
                    descriptor.args = words.collect();
                }
                ("Service", "WorkingDirectory") => {
                    descriptor.working_directory = Some(unescape(value))
                }
                ("Service", "Environment") => {
                    for assignment in split_words(&unescape(value)) {
                        if let Some((k, v)) = assignment.split_once('=') {
                            descriptor.environment.insert(k.to_string(), v.to_string());
                        }
                    }
                }
                ("Service", "User") => descriptor.credentials.user = Some(unescape(value)),
                ("Service", "Group") => descriptor.credentials.group = Some(unescape(value)),
                ("Service", "Restart") => descriptor.restart = parse_restart(value),
                ("Service", "RestartSec") => {
                    descriptor.restart_delay_secs = value.trim_end_matches('s').parse().ok()
                }
                ("Service", "StandardOutput") => descriptor.logging.stdout = parse_log_target(value),
                ("Service", "StandardError") => descriptor.logging.stderr = parse_log_target(value),
                ("Install", "WantedBy") => descriptor.run_at_load = !value.is_empty(),
                _ => {}
            }
        }

        descriptor
    }
}

fn restart_value(policy: RestartPolicy) -> &'static str {
    match policy {
        RestartPolicy::Never => "no",
        RestartPolicy::OnFailure => "on-failure",
        RestartPolicy::Always => "always",
    }
}

fn parse_restart(value: &str) -> RestartPolicy {
    match value {
        "" | "no" => RestartPolicy::Never,
        "always" => RestartPolicy::Always,
        _ => RestartPolicy::OnFailure,
    }
}

fn log_target_value(target: &LogTarget) -> Option<String> {
    match target {
        LogTarget::Default => None,
        LogTarget::Disabled => Some("null".to_string()),
        LogTarget::Path(path) => Some(format!("append:{}", escape(&path.to_string_lossy()))),
    }
}

fn parse_log_target(value: &str) -> LogTarget {
    if value == "null" {
        return LogTarget::Disabled;
    }
    match value
        .strip_prefix("append:")
        .or_else(|| value.strip_prefix("file:"))
    {
        Some(path) => LogTarget::Path(PathBuf::from(unescape(path))),
        None => LogTarget::Default,
    }
}

fn split_words(value: &str) -> Vec<String> {
    shell_words::split(value)
        .unwrap_or_else(|_| value.split_whitespace().map(str::to_string).collect())
}

// systemd expands `%` specifiers in most settings; `%%` is a literal percent.
fn escape(value: &str) -> String {
    value.replace('%', "%%")
}

fn unescape(value: &str) -> String {
    value.replace("%%", "%")
}
