//! `fpkit provision`

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use super::{CliConfig, configured_transformer};
use crate::installer::ArtifactTransformer;
use crate::provisioning::Provisioner;
use crate::resolver::LocalRepositoryResolver;
use crate::schema::SchemaExtractor;
use crate::template::OutputMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Fat,
    Thin,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fat => OutputMode::Fat,
            ModeArg::Thin => OutputMode::Thin,
        }
    }
}

/// Provision every configured feature pack into the staging directory.
#[derive(Args, Debug)]
pub struct ProvisionCommand {
    /// Override the configured output mode.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override the configured staging directory.
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Resolve every artifact in one batch before processing templates.
    #[arg(long)]
    pub bulk: bool,
}

impl ProvisionCommand {
    pub fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut config = cli.load_config()?;
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(staging) = self.staging_dir {
            config.staging_dir = staging;
        }
        config.bulk_resolution |= self.bulk;

        let resolver = LocalRepositoryResolver::new(&config.local_repository);
        let transformer = configured_transformer(&config)?;
        let mut schemas = SchemaExtractor::new(&config.staging_dir);

        let report = Provisioner::new(&config).with_progress(cli.show_progress()).run(
            &resolver,
            transformer.as_ref().map(|t| t as &dyn ArtifactTransformer),
            &mut schemas,
        )?;

        println!(
            "{} {} module template(s), {} artifact install(s) into {}",
            "Provisioned".green().bold(),
            report.templates,
            report.artifacts,
            config.staging_dir.display()
        );
        if !report.shaded.is_empty() {
            println!("  {} shaded archive(s)", report.shaded.len());
        }
        if report.transformed > 0 || !report.exclusions.is_empty() {
            println!(
                "  {} artifact(s) transformed, {} left untouched",
                report.transformed,
                report.exclusions.len()
            );
        }
        if report.skipped > 0 {
            println!("  {} optional artifact(s) skipped", report.skipped.to_string().yellow());
        }
        Ok(())
    }
}
