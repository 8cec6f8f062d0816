use clap::Parser;
use miette::Result;

use stackir::cli::Cli;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    cli.run()?;
    Ok(())
}
