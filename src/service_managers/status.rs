//! Parsers for `systemctl status` and `launchctl list` output

use crate::service_managers::error::ServiceError;
use crate::types::info::NO_PID;

const NOT_FOUND_PHRASE: &str = "could not be found";
const ACTIVE_MARKER: &str = "Active:";
const RUNNING_MARKER: &str = "active (running)";
const MAIN_PID_MARKER: &str = "Main PID:";
const NO_PID_FIELD: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedStatus {
    pub running: bool,
    pub pid: i32,
    /// The output carried a status report at all.
    pub reported: bool,
}

impl Default for ParsedStatus {
    fn default() -> Self {
        Self {
            running: false,
            pid: NO_PID,
            reported: false,
        }
    }
}

/// Scan `systemctl status` output. The PID is the third whitespace-separated
/// token of the `Main PID:` line and is only kept while the unit is running.
///
/// Only the header block is read. The journal tail after the first blank
/// line is service output and may contain anything.
pub fn parse_systemctl_status(name: &str, output: &str) -> Result<ParsedStatus, ServiceError> {
    if output.contains(NOT_FOUND_PHRASE) {
        return Err(ServiceError::does_not_exist(name));
    }

    let header = output
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .take_while(|line| !line.trim().is_empty());

    let mut status = ParsedStatus::default();
    for line in header {
        let line = line.trim();
        if line.contains(MAIN_PID_MARKER) {
            if let Some(pid) = line
                .split_whitespace()
                .nth(2)
                .and_then(|token| token.parse::<i32>().ok())
            {
                status.pid = pid;
            }
        } else if line.contains(ACTIVE_MARKER) {
            status.reported = true;
            if line.contains(RUNNING_MARKER) {
                status.running = true;
            }
        }
    }

    if !status.running {
        status.pid = NO_PID;
    }
    Ok(status)
}

/// Find `label` in `launchctl list` output. Rows are tab separated as
/// `PID  Status  Label`; a `-` PID means loaded but not running.
pub fn parse_launchctl_list(output: &str, label: &str) -> ParsedStatus {
    for line in output.lines() {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < 3 {
            continue;
        }
        if fields.last() != Some(&label) {
            continue;
        }

        return match fields[0] {
            NO_PID_FIELD => ParsedStatus {
                reported: true,
                ..Default::default()
            },
            pid => match pid.parse::<i32>() {
                Ok(pid) => ParsedStatus {
                    running: true,
                    pid,
                    reported: true,
                },
                Err(_) => ParsedStatus {
                    reported: true,
                    ..Default::default()
                },
            },
        };
    }
    ParsedStatus::default()
}
