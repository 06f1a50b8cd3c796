//! Where each engine keeps its configuration and log files
//!
//! Everything here is a pure function of the service name and the scope.

use crate::service_managers::host::Scope;
use std::path::PathBuf;

pub const SYSTEMD_SYSTEM_DIR: &str = "/etc/systemd/system";
pub const SYSTEMD_VENDOR_DIR: &str = "/usr/lib/systemd/system";
pub const SYSTEMD_USER_DIR: &str = ".config/systemd/user";
pub const SYSTEMD_EXTENSION: &str = "service";

pub const LAUNCHD_DAEMON_DIR: &str = "/Library/LaunchDaemons";
pub const LAUNCHD_AGENT_DIR: &str = "Library/LaunchAgents";
pub const LAUNCHD_SYSTEM_LOG_DIR: &str = "/Library/Logs";
pub const LAUNCHD_USER_LOG_DIR: &str = "Library/Logs";
pub const LAUNCHD_EXTENSION: &str = "plist";

/// Unit file path that installs write to.
pub fn systemd_unit_path(name: &str, scope: &Scope) -> PathBuf {
    let file = format!("{name}.{SYSTEMD_EXTENSION}");
    match scope {
        Scope::System => PathBuf::from(SYSTEMD_SYSTEM_DIR).join(file),
        Scope::User { home } => home.join(SYSTEMD_USER_DIR).join(file),
    }
}

/// Unit file paths to read from, in lookup order. System scope falls back to
/// the vendor directory where packages ship their units.
pub fn systemd_unit_candidates(name: &str, scope: &Scope) -> Vec<PathBuf> {
    let mut candidates = vec![systemd_unit_path(name, scope)];
    if scope.is_root() {
        candidates.push(PathBuf::from(SYSTEMD_VENDOR_DIR).join(format!("{name}.{SYSTEMD_EXTENSION}")));
    }
    candidates
}

pub fn launchd_plist_path(name: &str, scope: &Scope) -> PathBuf {
    let file = format!("{name}.{LAUNCHD_EXTENSION}");
    match scope {
        Scope::System => PathBuf::from(LAUNCHD_DAEMON_DIR).join(file),
        Scope::User { home } => home.join(LAUNCHD_AGENT_DIR).join(file),
    }
}

pub fn launchd_log_dir(name: &str, scope: &Scope) -> PathBuf {
    match scope {
        Scope::System => PathBuf::from(LAUNCHD_SYSTEM_LOG_DIR).join(name),
        Scope::User { home } => home.join(LAUNCHD_USER_LOG_DIR).join(name),
    }
}

/// Default (stdout, stderr) log files for a launchd job.
pub fn launchd_default_log_paths(name: &str, scope: &Scope) -> (PathBuf, PathBuf) {
    let dir = launchd_log_dir(name, scope);
    (
        dir.join(format!("{name}.stdout.log")),
        dir.join(format!("{name}.stderr.log")),
    )
}
