//! # CLI Module
//!
//! Command-line interface for imd2csv:
//! - Argument parsing with clap
//! - JSON job file loading for the extraction pipeline
//! - Subcommands for the two pipelines, file inspection and completions
//! - Logging setup from the global verbosity flags

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::ExtractConfig;
use crate::info;

/// Gridded climate data to per-location CSV time series
#[derive(Parser, Debug)]
#[command(name = "imd2csv")]
#[command(about = "Convert IMD grid files and NetCDF datasets to per-location CSV time series")]
#[command(version)]
#[command(long_about = "
imd2csv converts gridded meteorological datasets into per-location CSV time
series with daily, monthly, annual and seasonal aggregation.

PIPELINES:
  extract  IMD yearwise grid files (rain/tmax/tmin) -> per-location summaries,
           fetching missing grids from the IMD Pune portal on demand
  export   NetCDF dataset -> one CSV time series per exact grid point

EXAMPLES:
  # Summaries for every location in input-file.csv, 1991-2020
  imd2csv extract input-file.csv --start-year 1991 --end-year 2020

  # Same job from a JSON file
  imd2csv extract --config job.json

  # One CSV per grid point of a NetCDF export
  imd2csv export TN_IPED_daily_1991-20.nc -n pcp

  # File inspection
  imd2csv info TN_IPED_daily_1991-20.nc --detailed
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract per-location daily/annual/monthly/seasonal summaries from IMD grids
    Extract {
        /// Location table with Name,lat,lon columns
        #[arg(value_name = "INPUT_CSV")]
        input: Option<PathBuf>,

        /// First year to process
        #[arg(long)]
        start_year: Option<i32>,

        /// Last year to process (IMD publishes yearwise grids up to 2024)
        #[arg(long)]
        end_year: Option<i32>,

        /// Directory holding (or receiving) the downloaded grid files
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,

        /// Directory for the summary tables
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// JSON job file supplying the parameters above
        #[arg(short, long, env = "IMD2CSV_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Export the time series at every grid point of a NetCDF dataset
    Export {
        /// Input NetCDF file
        file: PathBuf,

        /// Data variable to export (default: first variable with time/lat/lon dimensions)
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Directory for the per-point tables
        #[arg(short, long, default_value = "output_csvs")]
        output_dir: PathBuf,
    },

    /// Show information about a NetCDF file
    Info {
        /// NetCDF file path
        file: PathBuf,

        /// Show global attributes as well
        #[arg(long)]
        detailed: bool,

        /// Emit JSON instead of the human-readable report
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Initializes env_logger from the global verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Executes the parsed command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Extract {
            input,
            start_year,
            end_year,
            data_dir,
            output_dir,
            config,
        } => {
            let job = resolve_extract_config(input, start_year, end_year, data_dir, output_dir, config)?;
            crate::run_extraction_job(&job).context("extraction pipeline failed")?;
        }

        Commands::Export {
            file,
            variable,
            output_dir,
        } => {
            let outcome = crate::run_export_job(&file, variable.as_deref(), &output_dir)
                .context("grid export pipeline failed")?;
            println!(
                "Exported {} grid point tables to {} ({} filename collisions disambiguated)",
                outcome.files_written,
                output_dir.display(),
                outcome.collisions
            );
        }

        Commands::Info {
            file,
            detailed,
            json,
        } => {
            let report = info::collect_info(&file, detailed)?;
            if json {
                info::print_json(&report)?;
            } else {
                info::print_human(&report);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }
    Ok(())
}

fn resolve_extract_config(
    input: Option<PathBuf>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    data_dir: PathBuf,
    output_dir: PathBuf,
    config: Option<PathBuf>,
) -> anyhow::Result<ExtractConfig> {
    if let Some(path) = config {
        return ExtractConfig::from_file(&path)
            .with_context(|| format!("failed to load job file {:?}", path));
    }

    let input_csv = input.context("INPUT_CSV is required unless --config is given")?;
    let start_year = start_year.context("--start-year is required unless --config is given")?;
    let end_year = end_year.context("--end-year is required unless --config is given")?;

    Ok(ExtractConfig {
        input_csv,
        start_year,
        end_year,
        data_dir,
        output_dir,
    })
}
