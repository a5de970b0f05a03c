// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use humantime_serde::re::humantime;
use sinker::config::SyncConfig;
use sinker::runtime::{RuntimeConfig, RuntimeType};
use sinker::types::Origin;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sinker")]
#[command(about = "Mirror container images between registries without redundant pulls")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Path to the image manifest (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Budget for the whole run, e.g. "30m" or "1h 30m"
    #[arg(long, global = true, default_value = "30m", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Container runtime to use instead of auto-detection
    #[arg(long, global = true, value_enum)]
    pub runtime: Option<RuntimeType>,

    /// Runtime socket path
    #[arg(long, global = true)]
    pub socket: Option<String>,

    /// Skip TLS verification for registry pulls (Podman only)
    #[arg(long, global = true)]
    pub no_tls_verify: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull every manifest image that is missing locally
    Pull {
        /// Which registry to pull from: source or target
        #[arg(default_value = "source")]
        origin: Origin,

        /// Images to pull instead of the manifest (repeatable, comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        images: Vec<String>,
    },

    /// List the images the manifest yields for a registry
    List {
        /// Which registry's references to list: source or target
        #[arg(default_value = "source")]
        origin: Origin,
    },
}

impl GlobalArgs {
    /// Assemble the run configuration for `origin` and the override list.
    pub fn sync_config(&self, origin: Origin, images: Vec<String>) -> SyncConfig {
        SyncConfig {
            manifest: self.manifest.clone(),
            images,
            origin,
            deadline: self.timeout,
            runtime: RuntimeConfig {
                runtime: self.runtime,
                socket: self.socket.clone(),
            },
            tls_verify: !self.no_tls_verify,
        }
    }
}
