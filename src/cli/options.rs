use crate::service_managers::Engine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main rustle-service CLI interface
#[derive(Parser)]
#[command(name = "rustle-service")]
#[command(about = "Install and control services under systemd or launchd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct RustleServiceCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Manager configuration file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Service engine (systemd, launchd); detected from the OS by default
    #[arg(long, global = true)]
    pub engine: Option<Engine>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Write a service configuration file
    Install {
        /// Service descriptor file (YAML or JSON)
        #[arg(long, conflicts_with_all = ["name", "template"], required_unless_present = "template")]
        descriptor: Option<PathBuf>,
        /// Service name, used with --template
        #[arg(long, requires = "template")]
        name: Option<String>,
        /// Native unit file or plist to install verbatim
        #[arg(long, requires = "name")]
        template: Option<PathBuf>,
    },

    /// Stop a service and remove its configuration file
    Uninstall {
        name: String,
    },

    /// Register and launch an installed service
    Start {
        name: String,
    },

    /// Stop and unregister a service
    Stop {
        name: String,
    },

    /// Show the state of a service
    Info {
        name: String,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the configuration file a descriptor encodes to
    Render {
        /// Service descriptor file (YAML or JSON)
        #[arg(long)]
        descriptor: PathBuf,
    },
}
