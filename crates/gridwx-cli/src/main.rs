use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use gridwx_cli::cli::{Cli, Commands};
use gridwx_cli::config::load_config;

use crate::commands::util::configure_threads;
use crate::commands::{fetch, inspect, process, refeature, synth};

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let Some(command) = &cli.command else {
        info!("No subcommand given; run with --help for usage");
        return;
    };

    configure_threads(&cli.threads);
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Loading configuration failed: {:?}", e);
            std::process::exit(2);
        }
    };

    let (name, result) = match command {
        Commands::Fetch {
            year,
            force,
            cache_dir,
        } => (
            "Fetch",
            fetch::handle(&config, *year, *force, cache_dir.as_ref()),
        ),
        Commands::Process(args) => ("Process", process::handle(&config, args)),
        Commands::Refeature {
            table,
            out,
            thresholds,
        } => (
            "Refeature",
            refeature::handle(&config, table, out.as_ref(), thresholds),
        ),
        Commands::Inspect { table, top } => ("Inspect", inspect::handle(table, *top)),
        Commands::Synth {
            base,
            year,
            out,
            thresholds,
        } => (
            "Synth",
            synth::handle(&config, base, *year, out, thresholds),
        ),
    };

    match result {
        Ok(()) => info!("{name} successful!"),
        Err(e) => {
            error!("{name} failed: {:?}", e);
            std::process::exit(1);
        }
    }
}
