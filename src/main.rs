use clap::{App, AppSettings};
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = App::new("epoch-txhandler")
        .about("Validates and commits UTXO transactions one epoch at a time.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(epoch_txhandler_lib::commands::process_command())
        .subcommand(epoch_txhandler_lib::commands::sample_command())
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("process") {
        epoch_txhandler_lib::commands::run_process_command(matches)
    } else if let Some(matches) = matches.subcommand_matches("sample") {
        epoch_txhandler_lib::commands::run_sample_command(matches)
    } else {
        panic!("Should report help.");
    }
}
