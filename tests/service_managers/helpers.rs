//! Fake command runners and environments for service manager tests

use async_trait::async_trait;
use rustle_service::service_managers::{
    CommandOutput, CommandRunner, Collaborators, FixedHost, HostContext, ServiceError,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

/// Canned reply for one invocation.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Fail { code: i32, output: String },
    SpawnError,
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Ok(String::new())
    }

    pub fn fail(code: i32, output: &str) -> Self {
        Reply::Fail {
            code,
            output: output.to_string(),
        }
    }

    fn into_output(self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        let base = CommandOutput {
            program: program.to_string(),
            args: args.to_vec(),
            ..Default::default()
        };
        match self {
            Reply::Ok(stdout) => Ok(CommandOutput {
                success: true,
                exit_code: Some(0),
                stdout,
                ..base
            }),
            Reply::Fail { code, output } => Ok(CommandOutput {
                success: false,
                exit_code: Some(code),
                stderr: output,
                ..base
            }),
            Reply::SpawnError => Err(ServiceError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: not found"),
            ))),
        }
    }
}

/// Records every invocation and answers from a script keyed on the joined
/// argument list. Unscripted invocations succeed with no output.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, args: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(args.to_string(), reply);
    }

    /// Every call so far as `program arg arg ...`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        let joined = args.join(" ");
        self.calls
            .lock()
            .unwrap()
            .push(format!("{program} {joined}").trim_end().to_string());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&joined)
            .cloned()
            .unwrap_or_else(Reply::ok);
        reply.into_output(program, args)
    }
}

/// Isolated home directory plus collaborators wired to a runner.
pub struct TestEnvironment {
    home: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            home: tempdir().expect("Failed to create temporary home"),
        }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn user_host(&self) -> Arc<dyn HostContext> {
        Arc::new(FixedHost::user(self.home.path()))
    }

    pub fn user_deps(&self, runner: Arc<dyn CommandRunner>) -> Collaborators {
        Collaborators::default()
            .with_runner(runner)
            .with_host(self.user_host())
    }

    pub fn root_deps(&self, runner: Arc<dyn CommandRunner>) -> Collaborators {
        Collaborators::default()
            .with_runner(runner)
            .with_host(Arc::new(FixedHost::root()))
    }

    pub fn systemd_unit(&self, name: &str) -> PathBuf {
        self.home()
            .join(".config/systemd/user")
            .join(format!("{name}.service"))
    }

    pub fn launchd_plist(&self, name: &str) -> PathBuf {
        self.home()
            .join("Library/LaunchAgents")
            .join(format!("{name}.plist"))
    }
}

/// Mimics a user-scope systemd manager: units exist when their file is on
/// disk, and `enable`/`start`/`stop`/`status` track state across calls.
pub struct FakeSystemd {
    unit_dir: PathBuf,
    state: Mutex<SystemdState>,
}

#[derive(Default)]
struct SystemdState {
    enabled: HashSet<String>,
    running: BTreeMap<String, i32>,
    next_pid: i32,
}

impl FakeSystemd {
    pub fn new(env: &TestEnvironment) -> Arc<Self> {
        Arc::new(Self {
            unit_dir: env.home().join(".config/systemd/user"),
            state: Mutex::new(SystemdState {
                next_pid: 1000,
                ..Default::default()
            }),
        })
    }

    fn unit_exists(&self, name: &str) -> bool {
        self.unit_dir.join(format!("{name}.service")).exists()
    }

    fn respond(&self, args: &[&str]) -> Reply {
        let mut state = self.state.lock().unwrap();
        match args {
            ["daemon-reload"] | ["reset-failed"] => Reply::ok(),
            ["enable", name] => {
                if !self.unit_exists(name) {
                    return Reply::fail(
                        1,
                        &format!("Failed to enable unit: Unit file {name}.service does not exist."),
                    );
                }
                state.enabled.insert(name.to_string());
                Reply::Ok(format!(
                    "Created symlink default.target.wants/{name}.service."
                ))
            }
            ["start", name] => {
                if !self.unit_exists(name) {
                    return Reply::fail(
                        5,
                        &format!("Failed to start {name}.service: Unit {name}.service not found."),
                    );
                }
                state.next_pid += 1;
                let pid = state.next_pid;
                state.running.insert(name.to_string(), pid);
                Reply::ok()
            }
            ["stop", name] => {
                if !self.unit_exists(name) && !state.running.contains_key(*name) {
                    return Reply::fail(
                        5,
                        &format!("Failed to stop {name}.service: Unit {name}.service not loaded."),
                    );
                }
                state.running.remove(*name);
                Reply::ok()
            }
            ["disable", name] => {
                if !self.unit_exists(name) {
                    return Reply::fail(
                        1,
                        &format!("Failed to disable unit: Unit file {name}.service does not exist."),
                    );
                }
                state.enabled.remove(*name);
                Reply::ok()
            }
            ["status", name] => match state.running.get(*name) {
                Some(pid) => Reply::Ok(format!(
                    "● {name}.service\n     Loaded: loaded\n     Active: active (running) since today\n   Main PID: {pid} ({name})\n\n\
                     Jan 01 host {name}[{pid}]: Active: warming up\n"
                )),
                None if self.unit_exists(name) => Reply::fail(
                    3,
                    &format!("○ {name}.service\n     Loaded: loaded\n     Active: inactive (dead)\n"),
                ),
                None => Reply::fail(4, &format!("Unit {name}.service could not be found.")),
            },
            other => Reply::fail(1, &format!("unexpected systemctl call: {other:?}")),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeSystemd {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        let scoped = match args_ref.split_first() {
            Some((&"--user", rest)) => rest,
            _ => return Reply::fail(1, "expected --user").into_output(program, args),
        };
        self.respond(scoped).into_output(program, args)
    }
}

/// Mimics launchctl's legacy load/unload interface over plists on disk.
pub struct FakeLaunchd {
    state: Mutex<LaunchdState>,
}

#[derive(Default)]
struct LaunchdState {
    loaded: BTreeMap<String, Option<i32>>,
    next_pid: i32,
}

impl FakeLaunchd {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LaunchdState {
                next_pid: 500,
                ..Default::default()
            }),
        })
    }

    fn label_of(path: &str) -> String {
        Path::new(path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn respond(&self, args: &[&str]) -> Reply {
        let mut state = self.state.lock().unwrap();
        match args {
            ["load", "-w", path] => {
                let content = match std::fs::read_to_string(path) {
                    Ok(content) => content,
                    Err(_) => return Reply::Ok(format!("{path}: No such file or directory")),
                };
                if !content.contains("<plist") {
                    return Reply::Ok(format!("{path}: Invalid property list"));
                }
                let label = Self::label_of(path);
                if state.loaded.contains_key(&label) {
                    return Reply::Ok(format!("{path}: service already loaded"));
                }
                state.loaded.insert(label, None);
                Reply::ok()
            }
            ["start", label] => {
                state.next_pid += 1;
                let pid = state.next_pid;
                match state.loaded.get_mut(*label) {
                    Some(slot) => {
                        *slot = Some(pid);
                        Reply::ok()
                    }
                    None => Reply::fail(3, "Could not find specified service"),
                }
            }
            ["stop", label] => match state.loaded.get_mut(*label) {
                Some(slot) => {
                    *slot = None;
                    Reply::ok()
                }
                None => Reply::fail(3, "Could not find specified service"),
            },
            ["unload", path] => {
                if state.loaded.remove(&Self::label_of(path)).is_some() {
                    Reply::ok()
                } else {
                    Reply::fail(
                        1,
                        &format!("Unload failed: 113: Could not find specified service\n{path}"),
                    )
                }
            }
            ["remove", label] => {
                state.loaded.remove(*label);
                Reply::ok()
            }
            ["list"] => {
                let mut out = String::from("PID\tStatus\tLabel\n");
                for (label, pid) in &state.loaded {
                    let pid = pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
                    out.push_str(&format!("{pid}\t0\t{label}\n"));
                }
                Reply::Ok(out)
            }
            other => Reply::fail(1, &format!("unexpected launchctl call: {other:?}")),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeLaunchd {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        self.respond(&args_ref).into_output(program, args)
    }
}
