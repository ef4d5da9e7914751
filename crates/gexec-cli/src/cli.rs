use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gexec_core::access::Capability;

/// Operator surface for sealing secrets and checking project access.
#[derive(Parser, Debug)]
#[command(
    name = "gexec",
    about = "Secret sealing and project access tooling for gexec",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Validate the passphrase and round-trip a sealed probe through storage.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Seal or open a single secret value.
    #[command(subcommand)]
    Secret(SecretCommand),
    /// Evaluate project access for a principal.
    #[command(subcommand)]
    Access(AccessCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file (with a generated passphrase) if none exists.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SecretCommand {
    /// Seal plaintext with the configured passphrase.
    Seal {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Open a sealed value.
    Open { blob: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AccessCommand {
    /// Decide whether a principal may exercise a capability on a project.
    Check {
        /// JSON file describing the principal and its grants.
        #[arg(long)]
        principal: PathBuf,
        #[arg(long)]
        project: String,
        /// One of `show`, `own`, `manage`.
        #[arg(long)]
        capability: Capability,
    },
}
