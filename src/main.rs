mod acceptance_filter;
mod assemble;
mod cli;
mod config;
mod contig;
mod contig_output;
mod driver;
mod globals;
mod graph;
mod graph_io;
mod kmer_node;
mod logger;
mod memoized_traverse;
mod os_utils;
mod path_builder;
mod run_stats;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::assemble::run_assemble;
use crate::cli::Commands;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Assemble(x) => {
            run_assemble(x);
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::parse_settings();

    // Validation of output_dir needs to be handled separately so that we don't log error messages
    // before logging is setup.
    logger::setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    let settings = cli::validate_and_fix_settings(settings);

    if let Err(err) = run(&settings) {
        eprintln!("{}", err);
        process::exit(2);
    }
}
