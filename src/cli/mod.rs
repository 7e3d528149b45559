//! Command-line interface for fpkit.
//!
//! The CLI is a thin front over [`Provisioner`](crate::provisioning::Provisioner):
//! it loads the run configuration, wires the bundled collaborators (local
//! Maven repository resolver, external transformer, schema extractor) and
//! reports the outcome.
//!
//! # Available Commands
//!
//! - `provision` - Provision every configured feature pack into the staging directory
//! - `shade` - Assemble a single shaded-model descriptor
//!
//! # Global Options
//!
//! - `--config <path>` - Run configuration (default `fpkit.toml`)
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only report errors
//! - `--no-progress` - Disable progress bars
//!
//! # Examples
//!
//! ```bash
//! fpkit provision --config fpkit.toml
//! fpkit --verbose provision --mode thin
//! fpkit shade packs/core/shaded/client.xml --pack wildfly-core
//! ```

mod provision;
mod shade;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ProvisioningConfig;
use crate::constants::{DEFAULT_CONFIG_FILE, NO_PROGRESS_ENV};
use crate::core::FpkitError;
use crate::installer::ExternalCommandTransformer;

pub use provision::ProvisionCommand;
pub use shade::ShadeCommand;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset. `None` keeps logging off.
    pub log_level: Option<String>,

    /// Hide progress bars.
    pub no_progress: bool,

    pub config_path: PathBuf,
}

impl CliConfig {
    /// Install the `tracing` subscriber.
    ///
    /// `RUST_LOG` wins unless `--verbose` forced `debug`.
    pub fn init_logging(&self, verbose: bool) {
        let Some(level) = &self.log_level else {
            return;
        };
        let filter = if verbose {
            EnvFilter::new(level)
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
        };
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).try_init();
    }

    /// Whether progress bars should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.no_progress && std::env::var(NO_PROGRESS_ENV).is_err()
    }

    pub fn load_config(&self) -> Result<ProvisioningConfig> {
        ProvisioningConfig::load(&self.config_path)
    }
}

/// fpkit: feature-pack provisioning from Maven artifacts and module templates.
#[derive(Parser, Debug)]
#[command(
    name = "fpkit",
    about = "Provision application-server feature packs from Maven artifacts",
    version,
    long_about = "fpkit resolves the artifacts referenced by feature-pack module templates, installs them \
                  (optionally transformed) into a staging directory and rewrites the templates to match."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (forces the `debug` log level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the run configuration.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Disable progress bars.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision every configured feature pack.
    Provision(ProvisionCommand),

    /// Assemble one shaded-model descriptor.
    Shade(ShadeCommand),
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging(self.verbose);
        self.execute_with_config(&config)
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    pub fn execute_with_config(self, config: &CliConfig) -> Result<()> {
        match self.command {
            Commands::Provision(cmd) => cmd.execute(config),
            Commands::Shade(cmd) => cmd.execute(config),
        }
    }
}

/// The external transformer configured in `[transform]`, when transformation is active.
fn configured_transformer(config: &ProvisioningConfig) -> Result<Option<ExternalCommandTransformer>> {
    if !config.transformation_active() {
        return Ok(None);
    }
    let command = config.transform.command.as_deref().ok_or_else(|| FpkitError::ConfigError {
        message: "transformation is enabled but [transform].command is not set".to_string(),
    })?;
    Ok(Some(ExternalCommandTransformer::new(command, config.transform.args.clone())?))
}
