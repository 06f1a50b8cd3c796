//! Translation between `ServiceDescriptor` and native configuration files
//!
//! Each engine supplies one codec. Drivers treat the encoded text as an
//! opaque blob: they never inspect unit-file or property-list syntax.

use crate::service_managers::error::ServiceError;
use crate::types::descriptor::ServiceDescriptor;

pub mod launchd;
pub mod plist;
pub mod systemd;

pub use launchd::LaunchdCodec;
pub use systemd::SystemdCodec;

pub trait DescriptorCodec: Send + Sync {
    /// File extension of the native format, without the dot.
    fn extension(&self) -> &'static str;

    /// Render the native file content for a descriptor.
    fn encode(&self, descriptor: &ServiceDescriptor) -> Result<String, ServiceError>;

    /// Parse native file content. Never fails: unknown keys are ignored and
    /// missing keys fall back to descriptor defaults. `name` is the file stem
    /// the text belongs to, used when the format does not record one.
    fn decode(&self, name: &str, text: &str) -> ServiceDescriptor;
}
