use crate::{
    EpochFile, EpochProcessor, Ed25519Verifier, SelectionParams, SelectionPolicy,
    DEFAULT_EXACT_COMPONENT_LIMIT,
};
use clap::{App, Arg, ArgMatches};
use std::error::Error;

struct ProcessCliOptions {
    epoch: String,
    policy: SelectionPolicy,
    exact_component_limit: usize,
}

impl ProcessCliOptions {
    pub fn parse(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            epoch: matches
                .value_of("epoch")
                .ok_or("Missing epoch file")?
                .to_string(),
            policy: matches.value_of_t::<SelectionPolicy>("policy")?,
            exact_component_limit: if matches.is_present("exact_limit") {
                matches.value_of_t::<usize>("exact_limit")?
            } else {
                DEFAULT_EXACT_COMPONENT_LIMIT
            },
        })
    }
}

pub fn process_command() -> App<'static> {
    App::new("process")
        .version("0.1")
        .about("Validates the candidate transactions of one epoch and commits a subset of them.")
        .arg(
            Arg::new("epoch")
                .short('e')
                .long("epoch")
                .value_name("FILE")
                .help("JSON file with the unspent outputs and the candidate transactions.")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("policy")
                .short('p')
                .long("policy")
                .value_name("POLICY")
                .help("Which valid transactions are committed: sequential or max-fee.")
                .takes_value(true)
                .possible_values(["sequential", "max-fee"])
                .default_value("sequential"),
        )
        .arg(
            Arg::new("exact_limit")
                .long("exact-limit")
                .value_name("N")
                .help("Largest group of conflicting transactions that max-fee searches exactly.")
                .takes_value(true)
                .required(false),
        )
}

pub fn run_process_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let options = ProcessCliOptions::parse(matches)?;
    let epoch = EpochFile::read(&options.epoch)?;
    let mut processor = EpochProcessor::with_verifier(
        &epoch.utxo_pool(),
        Ed25519Verifier,
        SelectionParams {
            exact_component_limit: options.exact_component_limit,
        },
    );
    let outcome = processor.process(options.policy, &epoch.candidates);

    println!("Accepted transactions:");
    for transaction in &outcome.accepted {
        println!("  {}", transaction.id());
    }
    println!("Rejected transactions:");
    for rejected in &outcome.rejected {
        println!("  #{} {}: {}", rejected.index, rejected.id, rejected.reason);
    }
    println!("Total fee: {}", outcome.total_fee);
    if outcome.approximated_components > 0 {
        println!(
            "Selected greedily in {} group(s) of related candidates, the fee may not be the highest possible.",
            outcome.approximated_components
        );
    }

    let mut utxos = processor.pool().iter().collect::<Vec<_>>();
    utxos.sort_by_key(|(output_ref, _)| **output_ref);
    println!("Unspent outputs:");
    for (output_ref, output) in utxos {
        println!("  {} -> {}", output_ref, output);
    }
    Ok(())
}
