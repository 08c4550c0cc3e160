use std::time::Instant;

use clap::Parser;

use imd2csv::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose, cli.quiet);

    let start_time = Instant::now();
    cli::run(cli)?;
    log::debug!("finished in {:?}", start_time.elapsed());
    Ok(())
}
