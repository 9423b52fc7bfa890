use crate::{
    EpochFile, KeyPair, OutputIndex, OutputRef, Sha256, Transaction, TransactionId,
    TransactionOutput, UtxoPool,
};
use clap::{App, Arg, ArgMatches};
use std::error::Error;

struct SampleCliOptions {
    out: String,
    seed: u8,
}

impl SampleCliOptions {
    pub fn parse(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            out: matches
                .value_of("out")
                .ok_or("Missing output file")?
                .to_string(),
            seed: matches.value_of_t::<u8>("seed")?,
        })
    }
}

pub fn sample_command() -> App<'static> {
    App::new("sample")
        .version("0.1")
        .about("Writes an epoch file with signed sample transactions.")
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("FILE")
                .help("Where to write the epoch file.")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed from which the sample keys are derived.")
                .takes_value(true)
                .default_value("1"),
        )
}

/// Two accounts own three outputs. The candidates are:
///   0. alice pays 4 to bob from her output of 10 (fee 6).
///   1. alice pays 9 to bob from the same output (fee 1). It conflicts with 0.
///   2. bob pays 3 to alice from the output he receives in 0 (fee 1).
///   3. bob pays 5 to himself from his own output of 5, signed by alice. It's invalid.
///   4. alice pays 2 to bob from her output of 3 (fee 1).
pub fn sample_epoch(seed: u8) -> EpochFile {
    let alice = KeyPair::from_seed(&[seed; 32]);
    let bob = KeyPair::from_seed(&[seed.wrapping_add(1); 32]);
    let genesis_id = TransactionId::new(Sha256::digest(&[seed]));
    let genesis = |index: u32| OutputRef::new(genesis_id, OutputIndex::new(index));

    let mut pool = UtxoPool::new();
    pool.insert(genesis(0), TransactionOutput::new(10, alice.public_key()));
    pool.insert(genesis(1), TransactionOutput::new(5, bob.public_key()));
    pool.insert(genesis(2), TransactionOutput::new(3, alice.public_key()));

    let pay_bob = Transaction::new_signed(
        &[(genesis(0), &alice)],
        vec![TransactionOutput::new(4, bob.public_key())],
    );
    let pay_bob_more = Transaction::new_signed(
        &[(genesis(0), &alice)],
        vec![TransactionOutput::new(9, bob.public_key())],
    );
    let pay_back = Transaction::new_signed(
        &[(OutputRef::new(*pay_bob.id(), OutputIndex::new(0)), &bob)],
        vec![TransactionOutput::new(3, alice.public_key())],
    );
    let forged = Transaction::new_signed(
        &[(genesis(1), &alice)],
        vec![TransactionOutput::new(5, bob.public_key())],
    );
    let change = Transaction::new_signed(
        &[(genesis(2), &alice)],
        vec![TransactionOutput::new(2, bob.public_key())],
    );
    EpochFile::new(
        &pool,
        vec![pay_bob, pay_bob_more, pay_back, forged, change],
    )
}

pub fn run_sample_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let options = SampleCliOptions::parse(matches)?;
    sample_epoch(options.seed).write(&options.out)?;
    println!("Sample epoch written to: {}", options.out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EpochProcessor, Rejection, SelectionPolicy};

    #[test]
    fn sample_epoch_outcome() {
        let epoch = sample_epoch(1);
        for policy in [SelectionPolicy::Sequential, SelectionPolicy::MaxFee].iter() {
            let mut processor = EpochProcessor::new(&epoch.utxo_pool());
            let outcome = processor.process(*policy, &epoch.candidates);
            let accepted = outcome
                .accepted
                .iter()
                .map(|tx| *tx.id())
                .collect::<Vec<_>>();
            assert_eq!(
                accepted,
                vec![
                    *epoch.candidates[0].id(),
                    *epoch.candidates[2].id(),
                    *epoch.candidates[4].id()
                ]
            );
            assert_eq!(outcome.total_fee, 8);
            assert_eq!(
                outcome.rejected[1].reason,
                Rejection::BadSignature { input_index: 0 }
            );
        }
    }
}
