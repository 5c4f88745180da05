mod commands;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use twdl_core::DateRange;
use twdl_engine::{ConfigStore, CONFIG_FILENAME};
use twdl_logging::{twdl_error, twdl_info};

use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    name = "twdl",
    version,
    about = "Save the media of tweets linked from a Twitter direct-message archive"
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Where log lines go
    #[arg(long, global = true, value_enum, default_value_t = LogDestination::File)]
    log: LogDestination,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Visit every linked tweet and download its images and videos
    Download(DownloadArgs),
    /// Write a copy of an archive restricted to a date range
    Select(SelectArgs),
    /// Sort downloaded images into folders by dominant colour
    Categorize,
    /// Print the effective configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Archive files (`direct-messages.js`)
    #[arg(required = true)]
    archives: Vec<PathBuf>,

    /// Override the destination directory
    #[arg(long)]
    destination: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SelectArgs {
    archive: PathBuf,

    /// Output file
    #[arg(long)]
    out: PathBuf,

    /// Earliest message date (defaults to the configured range, then the epoch)
    #[arg(long)]
    since: Option<String>,

    /// Latest message date (defaults to the configured range, then now)
    #[arg(long)]
    until: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            twdl_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let store = ConfigStore::new(&cli.config);
    let mut config = store.load();

    match cli.command {
        Commands::Download(args) => {
            if let Some(destination) = args.destination {
                config.destination_directory = destination;
            }
            twdl_info!(
                "saving into {}",
                config.destination_directory.display()
            );
            let summaries = commands::download(&config, &args.archives)?;
            summaries.iter().for_each(commands::report);
            let completed = summaries.len() == args.archives.len()
                && summaries.iter().all(|s| s.completed());
            Ok(if completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Select(args) => {
            let range = DateRange {
                since: args.since.or(config.range.since),
                until: args.until.or(config.range.until),
            };
            let stats = commands::select(&args.archive, &range, &args.out)?;
            println!(
                "{}/{} conversation(s), {}/{} message(s) written to {}",
                stats.conversations_kept,
                stats.conversations_total,
                stats.messages_kept,
                stats.messages_total,
                args.out.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Categorize => {
            commands::categorize(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { save } => {
            commands::show_config(&store, &config, save)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
