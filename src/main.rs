//! fpkit CLI entry point
//!
//! Parses the command line, runs the selected command and turns failures
//! into a readable report with a suggestion before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use fpkit::cli;
use fpkit::core::user_friendly_error;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute() {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
