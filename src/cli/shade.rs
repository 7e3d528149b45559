//! `fpkit shade`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{CliConfig, configured_transformer};
use crate::installer::ArtifactTransformer;
use crate::provisioning::Provisioner;
use crate::resolver::LocalRepositoryResolver;

/// Assemble one shaded-model descriptor into the staging directory.
#[derive(Args, Debug)]
pub struct ShadeCommand {
    /// Path to the `shaded-model` descriptor.
    pub descriptor: PathBuf,

    /// Feature pack whose version properties apply.
    #[arg(long)]
    pub pack: String,
}

impl ShadeCommand {
    pub fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config()?;
        let resolver = LocalRepositoryResolver::new(&config.local_repository);
        let transformer = configured_transformer(&config)?;

        let outcome = Provisioner::new(&config).shade(
            &resolver,
            transformer.as_ref().map(|t| t as &dyn ArtifactTransformer),
            &self.pack,
            &self.descriptor,
        )?;

        println!(
            "{} {} from {} archive(s)",
            "Assembled".green().bold(),
            outcome.output.display(),
            outcome.dependencies
        );
        Ok(())
    }
}
