//! Point-in-time status snapshot of a service

use crate::service_managers::error::ServiceError;
use crate::types::descriptor::ServiceDescriptor;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// PID reported when the service is not running or the PID is unknown.
pub const NO_PID: i32 = -1;

/// Snapshot returned by `ServiceManager::info`. Not a live handle: every
/// call re-reads the file and re-queries the manager.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: ServiceDescriptor,
    pub is_running: bool,
    pub pid: i32,
    pub file_path: PathBuf,
    pub file_content: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ServiceError>,
}

impl ServiceInfo {
    pub fn new(service: ServiceDescriptor, file_path: PathBuf) -> Self {
        Self {
            service,
            is_running: false,
            pid: NO_PID,
            file_path,
            file_content: String::new(),
            error: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.file_content.is_empty()
    }
}

fn serialize_error<S>(error: &Option<ServiceError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        None => serializer.serialize_none(),
        Some(error) => {
            let mut state = serializer.serialize_struct("ServiceError", 2)?;
            state.serialize_field("kind", error.kind())?;
            state.serialize_field("message", &error.to_string())?;
            state.end()
        }
    }
}
