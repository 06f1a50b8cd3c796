//! launchd property list codec

use crate::codec::plist::{self, PlistValue};
use crate::codec::DescriptorCodec;
use crate::service_managers::error::ServiceError;
use crate::types::descriptor::{LogTarget, RestartPolicy, ServiceDescriptor};
use handlebars::Handlebars;
use serde_json::json;
use std::path::PathBuf;

const DEV_NULL: &str = "/dev/null";
const DESCRIPTION_KEY: &str = "ServiceDescription";
const DOCUMENTATION_KEY: &str = "ServiceDocumentation";

const PLIST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{{label}}</string>
    {{#if description}}
    <key>ServiceDescription</key>
    <string>{{description}}</string>
    {{/if}}
    {{#if documentation}}
    <key>ServiceDocumentation</key>
    <string>{{documentation}}</string>
    {{/if}}
    <key>ProgramArguments</key>
    <array>
        {{#each program_arguments}}
        <string>{{this}}</string>
        {{/each}}
    </array>
    {{#if has_working_directory}}
    <key>WorkingDirectory</key>
    <string>{{working_directory}}</string>
    {{/if}}
    {{#if environment}}
    <key>EnvironmentVariables</key>
    <dict>
        {{#each environment}}
        <key>{{key}}</key>
        <string>{{value}}</string>
        {{/each}}
    </dict>
    {{/if}}
    {{#if has_user}}
    <key>UserName</key>
    <string>{{user}}</string>
    {{/if}}
    {{#if has_group}}
    <key>GroupName</key>
    <string>{{group}}</string>
    {{/if}}
    <key>RunAtLoad</key>
    {{#if run_at_load}}<true/>{{else}}<false/>{{/if}}
    <key>KeepAlive</key>
    {{#if keep_alive_always}}<true/>{{else}}{{#if keep_alive_on_failure}}<dict>
        <key>SuccessfulExit</key>
        <false/>
    </dict>{{else}}<false/>{{/if}}{{/if}}
    {{#if has_throttle_interval}}
    <key>ThrottleInterval</key>
    <integer>{{throttle_interval}}</integer>
    {{/if}}
    {{#if stdout}}
    <key>StandardOutPath</key>
    <string>{{stdout}}</string>
    {{/if}}
    {{#if stderr}}
    <key>StandardErrorPath</key>
    <string>{{stderr}}</string>
    {{/if}}
</dict>
</plist>
"#;

/// Encodes descriptors as launchd job property lists.
///
/// launchd has no keys for free text, so `description` and `documentation`
/// go under `ServiceDescription` and `ServiceDocumentation`, which launchd
/// ignores.
pub struct LaunchdCodec {
    handlebars: Handlebars<'static>,
}

impl Default for LaunchdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchdCodec {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(plist::escape);
        Self { handlebars }
    }
}

impl DescriptorCodec for LaunchdCodec {
    fn extension(&self) -> &'static str {
        "plist"
    }

    fn encode(&self, descriptor: &ServiceDescriptor) -> Result<String, ServiceError> {
        let program_arguments: Vec<&str> = std::iter::once(descriptor.executable.as_str())
            .chain(descriptor.args.iter().map(String::as_str))
            .collect();

        let environment: Vec<serde_json::Value> = descriptor
            .environment
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();

        let data = json!({
            "label": descriptor.name,
            "description": descriptor.description,
            "documentation": descriptor.documentation,
            "program_arguments": program_arguments,
            "has_working_directory": descriptor.working_directory.is_some(),
            "working_directory": descriptor.working_directory,
            "environment": environment,
            "has_user": descriptor.credentials.user.is_some(),
            "user": descriptor.credentials.user,
            "has_group": descriptor.credentials.group.is_some(),
            "group": descriptor.credentials.group,
            "run_at_load": descriptor.run_at_load,
            "keep_alive_always": descriptor.restart == RestartPolicy::Always,
            "keep_alive_on_failure": descriptor.restart == RestartPolicy::OnFailure,
            "has_throttle_interval": descriptor.restart_delay_secs.is_some(),
            "throttle_interval": descriptor.restart_delay_secs,
            "stdout": log_target_value(&descriptor.logging.stdout),
            "stderr": log_target_value(&descriptor.logging.stderr),
        });

        Ok(self.handlebars.render_template(PLIST_TEMPLATE, &data)?)
    }

    fn decode(&self, name: &str, text: &str) -> ServiceDescriptor {
        let mut descriptor = ServiceDescriptor {
            name: name.to_string(),
            ..Default::default()
        };

        let Some(root) = plist::parse(text) else {
            return descriptor;
        };

        if let Some(label) = root.get("Label").and_then(PlistValue::as_str) {
            if !label.is_empty() {
                descriptor.name = label.to_string();
            }
        }

        let string_value = |key: &str| {
            root.get(key)
                .and_then(PlistValue::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        descriptor.description = string_value(DESCRIPTION_KEY);
        descriptor.documentation = string_value(DOCUMENTATION_KEY);

        match root.get("ProgramArguments").and_then(PlistValue::as_array) {
            Some(arguments) => {
                let mut words = arguments
                    .iter()
                    .filter_map(PlistValue::as_str)
                    .map(str::to_string);
                descriptor.executable = words.next().unwrap_or_default();
                descriptor.args = words.collect();
            }
            None => {
                if let Some(program) = root.get("Program").and_then(PlistValue::as_str) {
                    descriptor.executable = program.to_string();
                }
            }
        }

        descriptor.working_directory = root
            .get("WorkingDirectory")
            .and_then(PlistValue::as_str)
            .map(str::to_string);

        if let Some(entries) = root.get("EnvironmentVariables").and_then(PlistValue::as_dict) {
            for (key, value) in entries {
                if let Some(value) = value.as_str() {
                    descriptor.environment.insert(key.clone(), value.to_string());
                }
            }
        }

        descriptor.credentials.user = root
            .get("UserName")
            .and_then(PlistValue::as_str)
            .map(str::to_string);
        descriptor.credentials.group = root
            .get("GroupName")
            .and_then(PlistValue::as_str)
            .map(str::to_string);

        descriptor.run_at_load = root
            .get("RunAtLoad")
            .and_then(PlistValue::as_bool)
            .unwrap_or(false);

        descriptor.restart = match root.get("KeepAlive") {
            Some(PlistValue::Boolean(true)) => RestartPolicy::Always,
            Some(keep_alive @ PlistValue::Dict(_)) => {
                match keep_alive.get("SuccessfulExit").and_then(PlistValue::as_bool) {
                    Some(false) => RestartPolicy::OnFailure,
                    _ => RestartPolicy::Always,
                }
            }
            _ => RestartPolicy::Never,
        };

        descriptor.restart_delay_secs = root
            .get("ThrottleInterval")
            .and_then(PlistValue::as_integer)
            .and_then(|secs| u64::try_from(secs).ok());

        descriptor.logging.stdout = parse_log_target(root.get("StandardOutPath"));
        descriptor.logging.stderr = parse_log_target(root.get("StandardErrorPath"));

        descriptor
    }
}

fn log_target_value(target: &LogTarget) -> Option<String> {
    match target {
        LogTarget::Default => None,
        LogTarget::Disabled => Some(DEV_NULL.to_string()),
        LogTarget::Path(path) => Some(path.to_string_lossy().into_owned()),
    }
}

fn parse_log_target(value: Option<&PlistValue>) -> LogTarget {
    match value.and_then(PlistValue::as_str) {
        None => LogTarget::Default,
        Some(DEV_NULL) => LogTarget::Disabled,
        Some(path) => LogTarget::Path(PathBuf::from(path)),
    }
}
