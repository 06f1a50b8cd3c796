//! Rustle Service - cross-platform service lifecycle management
//!
//! This crate installs, starts, stops, inspects and removes long-running
//! services under systemd (Linux) and launchd (macOS) through one
//! `ServiceManager` interface. Service definitions are described once as a
//! `ServiceDescriptor` and encoded into each engine's native file format.

pub mod cli;
pub mod codec;
pub mod config;
pub mod service_managers;
pub mod types;

pub use config::ManagerConfig;
pub use service_managers::{
    from_descriptor, from_name, from_raw_template, Collaborators, Engine, ServiceError,
    ServiceManager,
};
pub use types::*;
